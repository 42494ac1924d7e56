// Domain models

mod network;

pub use network::{ContainerNetworkStats, InterfaceStats, NetworkSnapshot};
