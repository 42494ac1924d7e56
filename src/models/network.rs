// Normalized per-container network stats models

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters for one named container interface, resolved from a host endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStats {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// One container's network stats for a single collection pass.
///
/// `interfaces` holds each interface name at most once, in the order the
/// host reported them. `primary` is a copy of the first entry, `None` when
/// the container exposed no resolvable interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerNetworkStats {
    pub timestamp: u64,
    pub interfaces: Vec<InterfaceStats>,
    #[serde(default)]
    pub primary: Option<InterfaceStats>,
}

/// Result of one collection pass, keyed by container id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub timestamp: u64,
    pub containers: HashMap<String, ContainerNetworkStats>,
}
