// Docker engine backend for the host compute contract (bollard)

use super::{
    ComputeError, ContainerDescriptor, ContainerHandle, Endpoint, EndpointCounter, HostCompute,
    RawStatistics,
};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{InspectContainerOptions, ListContainersOptions, StatsOptions};
use futures_util::StreamExt;
use std::collections::HashMap;

pub struct DockerCompute {
    docker: Docker,
}

impl DockerCompute {
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_unix_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl HostCompute for DockerCompute {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>, ComputeError> {
        let mut filters = HashMap::new();
        filters.insert("status".to_string(), vec!["running".to_string()]);

        let options = ListContainersOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| ComputeError::Enumerate(e.into()))?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let id = c.id.unwrap_or_default();
                let name = c
                    .names
                    .as_ref()
                    .and_then(|n| n.first())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_else(|| id.clone());
                ContainerDescriptor { id, name }
            })
            .collect())
    }

    async fn open_container(&self, id: &str) -> Result<Box<dyn ContainerHandle>, ComputeError> {
        // Verify the container still exists before handing out a handle;
        // it may have exited since enumeration.
        self.docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| ComputeError::OpenContainer {
                id: id.to_string(),
                source: e.into(),
            })?;

        Ok(Box::new(DockerContainerHandle {
            docker: self.docker.clone(),
            id: id.to_string(),
        }))
    }

    async fn endpoint_by_id(&self, endpoint_id: &str) -> Result<Endpoint, ComputeError> {
        // The engine keys counters by interface name, so the endpoint id is
        // already the name. HCS-style hosts resolve an opaque id here.
        Ok(Endpoint {
            id: endpoint_id.to_string(),
            name: endpoint_id.to_string(),
        })
    }
}

struct DockerContainerHandle {
    docker: Docker,
    id: String,
}

#[async_trait]
impl ContainerHandle for DockerContainerHandle {
    async fn statistics(&mut self) -> Result<RawStatistics, ComputeError> {
        let options = StatsOptions {
            stream: false,
            ..Default::default()
        };
        let mut stream = self.docker.stats(&self.id, Some(options));
        let response = stream
            .next()
            .await
            .ok_or_else(|| {
                ComputeError::QueryStatistics("stats stream ended without a sample".into())
            })?
            .map_err(|e| ComputeError::QueryStatistics(e.into()))?;

        // Prefer the engine's own sample time (RFC 3339); fall back to wall clock.
        let timestamp = response
            .read
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp_millis().max(0) as u64)
            .unwrap_or_else(now_millis);

        // The engine reports counters as an unordered map; sort by name so
        // primary-interface selection is deterministic across passes.
        let mut network: Vec<EndpointCounter> = response
            .networks
            .map(|networks| {
                networks
                    .into_iter()
                    .map(|(name, stats)| EndpointCounter {
                        endpoint_id: name,
                        bytes_received: stats.rx_bytes.unwrap_or(0),
                        bytes_sent: stats.tx_bytes.unwrap_or(0),
                    })
                    .collect()
            })
            .unwrap_or_default();
        network.sort_by(|a, b| a.endpoint_id.cmp(&b.endpoint_id));

        Ok(RawStatistics { timestamp, network })
    }

    async fn release(self: Box<Self>) -> Result<(), ComputeError> {
        // One-shot stats hold no server-side state on this backend.
        Ok(())
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
