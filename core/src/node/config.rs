/// Node tuning knobs

use crate::dedup::DEFAULT_DEDUP_CAPACITY;
use crate::packet::DEFAULT_TTL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Radio poll period in milliseconds
    pub intake_tick_ms: u64,
    /// Routing advertisement period in milliseconds
    pub advertise_interval_ms: u64,
    /// TTL stamped on packets this node originates
    pub default_ttl: u8,
    /// Size of the duplicate-suppression window
    pub dedup_capacity: usize,
    /// Drop received packets whose checksum does not verify
    pub verify_checksums: bool,
    /// Run the interactive console task
    pub console: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            intake_tick_ms: 10,
            advertise_interval_ms: 10_000,
            default_ttl: DEFAULT_TTL,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            verify_checksums: false,
            console: true,
        }
    }
}

impl NodeConfig {
    pub fn intake_tick(&self) -> Duration {
        Duration::from_millis(self.intake_tick_ms.max(1))
    }

    pub fn advertise_interval(&self) -> Duration {
        Duration::from_millis(self.advertise_interval_ms.max(1))
    }
}
