use std::fmt;

use serde::{Deserialize, Serialize};

/// CPU utilization over one sampling period.
///
/// `Unknown` is used when the counter could not be read or has no baseline
/// yet, so that it is never confused with a measured idle process.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "percent", rename_all = "lowercase")]
pub enum CpuLoad {
    Measured(f64),
    #[default]
    Unknown,
}

impl CpuLoad {
    /// Clamp into `0..=100`; non-finite readings become `Unknown`.
    pub fn measured(percent: f64) -> Self {
        if percent.is_finite() {
            Self::Measured(percent.clamp(0.0, 100.0))
        } else {
            Self::Unknown
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::Measured(p) => Some(*p),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for CpuLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured(p) => write!(f, "{:.2} %", p),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Point-in-time resource usage of one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub threads: u32,
    /// PSS on Linux, working set on Windows
    pub memory_bytes: u64,
    pub virtual_bytes: u64,
    pub handles: u32,
    pub cpu_load: CpuLoad,
    /// Size on disk of the target, queried once at start
    pub binary_size: u64,
}

impl ResourceSample {
    pub fn new(threads: u32, memory_bytes: u64, handles: u32, cpu_load: CpuLoad) -> Self {
        Self {
            threads,
            memory_bytes,
            virtual_bytes: 0,
            handles,
            cpu_load,
            binary_size: 0,
        }
    }

    pub fn with_virtual(mut self, virtual_bytes: u64) -> Self {
        self.virtual_bytes = virtual_bytes;
        self
    }

    pub fn with_binary_size(mut self, binary_size: u64) -> Self {
        self.binary_size = binary_size;
        self
    }
}

/// Network traffic attributed to a process (or its network namespace)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub bytes_recv: u64,
    pub packets_recv: u64,
    /// Payload size of the messages the target was sending
    pub msg_size: u32,
}

impl NetworkCounters {
    pub fn new(bytes_sent: u64, packets_sent: u64, bytes_recv: u64, packets_recv: u64) -> Self {
        Self {
            bytes_sent,
            packets_sent,
            bytes_recv,
            packets_recv,
            msg_size: 0,
        }
    }

    pub fn with_msg_size(mut self, msg_size: u32) -> Self {
        self.msg_size = msg_size;
        self
    }

    /// Traffic accumulated since `baseline`.
    pub fn since(&self, baseline: &NetworkCounters) -> NetworkCounters {
        NetworkCounters {
            bytes_sent: self.bytes_sent.saturating_sub(baseline.bytes_sent),
            packets_sent: self.packets_sent.saturating_sub(baseline.packets_sent),
            bytes_recv: self.bytes_recv.saturating_sub(baseline.bytes_recv),
            packets_recv: self.packets_recv.saturating_sub(baseline.packets_recv),
            msg_size: self.msg_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_load_display() {
        assert_eq!(CpuLoad::Measured(12.5).to_string(), "12.50 %");
        assert_eq!(CpuLoad::Measured(0.0).to_string(), "0.00 %");
        assert_eq!(CpuLoad::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_cpu_load_measured_clamps() {
        assert_eq!(CpuLoad::measured(140.0), CpuLoad::Measured(100.0));
        assert_eq!(CpuLoad::measured(f64::NAN), CpuLoad::Unknown);
        assert_eq!(CpuLoad::measured(0.0).percent(), Some(0.0));
        assert_eq!(CpuLoad::Unknown.percent(), None);
    }

    #[test]
    fn test_network_since_saturates() {
        let base = NetworkCounters::new(100, 2, 50, 1);
        let now = NetworkCounters::new(400, 5, 40, 3).with_msg_size(256);
        let delta = now.since(&base);
        assert_eq!(delta.bytes_sent, 300);
        assert_eq!(delta.packets_sent, 3);
        assert_eq!(delta.bytes_recv, 0);
        assert_eq!(delta.packets_recv, 2);
        assert_eq!(delta.msg_size, 256);
    }
}
