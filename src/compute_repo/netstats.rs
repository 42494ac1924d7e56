// Translate raw host compute counters into normalized network stats.

use super::{ComputeError, ContainerDescriptor, EndpointCounter, HostCompute, RawStatistics};
use crate::models::{ContainerNetworkStats, InterfaceStats};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Query one container's raw statistics through a scoped handle.
///
/// The handle is released on every exit path past a successful open. When
/// both the query and the release fail, the returned error names both
/// causes; a release failure alone still fails the fetch, since the handle
/// leaked even though the data was computed.
pub async fn fetch_container_stats(
    client: &dyn HostCompute,
    container: &ContainerDescriptor,
) -> Result<RawStatistics, ComputeError> {
    let mut handle = client.open_container(&container.id).await?;
    let stats = handle.statistics().await;
    let released = handle.release().await;
    match (stats, released) {
        (Ok(stats), Ok(())) => Ok(stats),
        (Ok(_), Err(release)) => Err(release),
        (Err(query), Ok(())) => Err(query),
        (Err(query), Err(release)) => Err(ComputeError::QueryAndRelease {
            query: Box::new(query),
            release: Box::new(release),
        }),
    }
}

/// Resolve one raw counter into a named interface. A single lookup per
/// counter per pass; no retry.
async fn resolve_interface(
    client: &dyn HostCompute,
    counter: &EndpointCounter,
) -> Result<InterfaceStats, ComputeError> {
    let endpoint = client.endpoint_by_id(&counter.endpoint_id).await?;
    Ok(InterfaceStats {
        name: endpoint.name,
        rx_bytes: counter.bytes_received,
        tx_bytes: counter.bytes_sent,
    })
}

/// Normalize one container's raw counters. Never fails as a whole: a counter
/// whose endpoint cannot be resolved is logged and skipped.
pub async fn aggregate_network_stats(
    client: &dyn HostCompute,
    timestamp: u64,
    counters: &[EndpointCounter],
) -> ContainerNetworkStats {
    let mut interfaces: Vec<InterfaceStats> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for counter in counters {
        let interface = match resolve_interface(client, counter).await {
            Ok(i) => i,
            Err(e) => {
                warn!(
                    endpoint_id = %counter.endpoint_id,
                    error = %e,
                    "endpoint resolution failed; continuing with remaining endpoints"
                );
                continue;
            }
        };

        // Count each interface once; the first occurrence wins.
        if !seen.insert(interface.name.clone()) {
            continue;
        }
        interfaces.push(interface);
    }

    let primary = interfaces.first().cloned();
    ContainerNetworkStats {
        timestamp,
        interfaces,
        primary,
    }
}

/// Collect normalized network stats for all running containers.
///
/// Enumeration failure aborts the pass. Everything past enumeration is
/// isolated: a container whose stats cannot be fetched is skipped, and a
/// container with no network counters contributes no entry at all.
pub async fn collect_network_stats(
    client: &dyn HostCompute,
) -> Result<HashMap<String, ContainerNetworkStats>, ComputeError> {
    let containers = client.list_containers().await?;

    let mut stats = HashMap::new();
    for container in &containers {
        let raw = match fetch_container_stats(client, container).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(
                    container_id = %container.id,
                    error = %e,
                    "failed to fetch statistics; continuing with remaining containers"
                );
                continue;
            }
        };
        if raw.network.is_empty() {
            continue;
        }
        let normalized = aggregate_network_stats(client, raw.timestamp, &raw.network).await;
        stats.insert(container.id.clone(), normalized);
    }

    Ok(stats)
}
