// Container network stats via the host compute layer

mod docker;
mod netstats;

pub use docker::DockerCompute;
pub use netstats::{aggregate_network_stats, collect_network_stats, fetch_container_stats};

use crate::models::ContainerNetworkStats;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// One container as reported by enumeration.
#[derive(Debug, Clone)]
pub struct ContainerDescriptor {
    pub id: String,
    pub name: String,
}

/// Raw per-endpoint counters as reported by the host, in host order.
#[derive(Debug, Clone)]
pub struct EndpointCounter {
    pub endpoint_id: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

/// One container's raw statistics snapshot (unix millis + counters).
#[derive(Debug, Clone)]
pub struct RawStatistics {
    pub timestamp: u64,
    pub network: Vec<EndpointCounter>,
}

/// A network endpoint resolved to its interface name.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("failed to enumerate containers: {0}")]
    Enumerate(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to open container `{id}`: {source}")]
    OpenContainer {
        id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to query container statistics: {0}")]
    QueryStatistics(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to release container handle: {0}")]
    ReleaseHandle(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to resolve endpoint `{endpoint_id}`: {source}")]
    ResolveEndpoint {
        endpoint_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("statistics query failed ({query}); handle release also failed ({release})")]
    QueryAndRelease {
        query: Box<ComputeError>,
        release: Box<ComputeError>,
    },
}

/// Capability surface over the host compute layer. The production backend
/// is [`DockerCompute`]; tests substitute a scripted fake.
#[async_trait]
pub trait HostCompute: Send + Sync {
    /// Enumerate running containers. No partial results on failure.
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>, ComputeError>;

    /// Acquire a statistics handle for one container. The handle must be
    /// released exactly once via [`ContainerHandle::release`].
    async fn open_container(&self, id: &str) -> Result<Box<dyn ContainerHandle>, ComputeError>;

    /// Resolve an endpoint id to its interface name.
    async fn endpoint_by_id(&self, endpoint_id: &str) -> Result<Endpoint, ComputeError>;
}

/// An acquired reference to one running container.
#[async_trait]
pub trait ContainerHandle: Send {
    async fn statistics(&mut self) -> Result<RawStatistics, ComputeError>;

    /// Release the handle. Consumes it, so a handle cannot be released twice.
    async fn release(self: Box<Self>) -> Result<(), ComputeError>;
}

pub struct ComputeRepo {
    client: Arc<dyn HostCompute>,
}

impl ComputeRepo {
    pub fn new(client: Arc<dyn HostCompute>) -> Self {
        Self { client }
    }

    /// Connect to the local Docker engine, the default backend.
    pub fn connect() -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(DockerCompute::connect()?)))
    }

    /// Run one collection pass over all running containers.
    pub async fn collect_network_stats(
        &self,
    ) -> Result<HashMap<String, ContainerNetworkStats>, ComputeError> {
        collect_network_stats(self.client.as_ref()).await
    }
}
