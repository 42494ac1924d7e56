// Shared test helpers: a scripted host compute fake

use async_trait::async_trait;
use netstatsd::compute_repo::{
    ComputeError, ContainerDescriptor, ContainerHandle, Endpoint, EndpointCounter, HostCompute,
    RawStatistics,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const FAKE_TIMESTAMP: u64 = 1_700_000_000_000;

pub fn counter(endpoint_id: &str, rx: u64, tx: u64) -> EndpointCounter {
    EndpointCounter {
        endpoint_id: endpoint_id.to_string(),
        bytes_received: rx,
        bytes_sent: tx,
    }
}

/// Host compute fake with per-container scripted stats and failure
/// injection for every contract operation. `release_calls` counts handle
/// releases across all containers.
#[derive(Default)]
pub struct FakeCompute {
    containers: Vec<ContainerDescriptor>,
    stats: HashMap<String, RawStatistics>,
    endpoints: HashMap<String, String>,
    fail_enumerate: bool,
    fail_open: HashSet<String>,
    fail_query: HashSet<String>,
    fail_release: HashSet<String>,
    pub release_calls: Arc<AtomicUsize>,
}

impl FakeCompute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, id: &str, counters: Vec<EndpointCounter>) -> Self {
        self.containers.push(descriptor(id));
        self.stats.insert(
            id.to_string(),
            RawStatistics {
                timestamp: FAKE_TIMESTAMP,
                network: counters,
            },
        );
        self
    }

    pub fn with_endpoint(mut self, id: &str, name: &str) -> Self {
        self.endpoints.insert(id.to_string(), name.to_string());
        self
    }

    pub fn failing_enumerate(mut self) -> Self {
        self.fail_enumerate = true;
        self
    }

    /// A container that exists in enumeration but whose handle cannot be
    /// opened (exited between enumeration and open).
    pub fn failing_open(mut self, id: &str) -> Self {
        self.containers.push(descriptor(id));
        self.fail_open.insert(id.to_string());
        self
    }

    pub fn failing_query(mut self, id: &str) -> Self {
        self.containers.push(descriptor(id));
        self.fail_query.insert(id.to_string());
        self
    }

    pub fn failing_release(mut self, id: &str) -> Self {
        self.fail_release.insert(id.to_string());
        self
    }

    pub fn descriptor_for(&self, id: &str) -> ContainerDescriptor {
        descriptor(id)
    }
}

fn descriptor(id: &str) -> ContainerDescriptor {
    ContainerDescriptor {
        id: id.to_string(),
        name: format!("{id}-name"),
    }
}

#[async_trait]
impl HostCompute for FakeCompute {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>, ComputeError> {
        if self.fail_enumerate {
            return Err(ComputeError::Enumerate("host query failed".into()));
        }
        Ok(self.containers.clone())
    }

    async fn open_container(&self, id: &str) -> Result<Box<dyn ContainerHandle>, ComputeError> {
        if self.fail_open.contains(id) {
            return Err(ComputeError::OpenContainer {
                id: id.to_string(),
                source: "no such container".into(),
            });
        }
        Ok(Box::new(FakeHandle {
            stats: self.stats.get(id).cloned(),
            fail_query: self.fail_query.contains(id),
            fail_release: self.fail_release.contains(id),
            release_calls: Arc::clone(&self.release_calls),
        }))
    }

    async fn endpoint_by_id(&self, endpoint_id: &str) -> Result<Endpoint, ComputeError> {
        match self.endpoints.get(endpoint_id) {
            Some(name) => Ok(Endpoint {
                id: endpoint_id.to_string(),
                name: name.clone(),
            }),
            None => Err(ComputeError::ResolveEndpoint {
                endpoint_id: endpoint_id.to_string(),
                source: "unknown endpoint".into(),
            }),
        }
    }
}

struct FakeHandle {
    stats: Option<RawStatistics>,
    fail_query: bool,
    fail_release: bool,
    release_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ContainerHandle for FakeHandle {
    async fn statistics(&mut self) -> Result<RawStatistics, ComputeError> {
        if self.fail_query {
            return Err(ComputeError::QueryStatistics("stats query failed".into()));
        }
        self.stats
            .clone()
            .ok_or_else(|| ComputeError::QueryStatistics("no stats scripted".into()))
    }

    async fn release(self: Box<Self>) -> Result<(), ComputeError> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(ComputeError::ReleaseHandle("release failed".into()));
        }
        Ok(())
    }
}
