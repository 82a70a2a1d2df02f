use serde::{Deserialize, Serialize};

/// Machine the measurement ran on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub cpu_count: u32,
    /// Available physical memory in bytes
    pub avail_memory: u64,
}

impl DeviceInfo {
    pub fn new(cpu_count: u32, avail_memory: u64) -> Self {
        Self {
            cpu_count,
            avail_memory,
        }
    }
}
