use std::fs;

use crate::domain::DeviceInfo;
use crate::ports::{ProbeError, ProbeResult, SystemSource};

use super::parser;
use super::ProcfsConfig;

/// System source implementation using procfs
pub struct ProcfsSystemSource {
    config: ProcfsConfig,
}

impl ProcfsSystemSource {
    pub fn new(config: ProcfsConfig) -> Self {
        Self { config }
    }

    fn read_file(&self, name: &str) -> ProbeResult<String> {
        let path = self.config.proc_path.join(name);
        fs::read_to_string(&path).map_err(|source| ProbeError::Io { path, source })
    }

    /// Count the per-CPU `cpuN` lines of /proc/stat
    fn cpu_count(&self) -> u32 {
        let from_stat = self.read_file("stat").ok().map(|content| {
            content
                .lines()
                .filter(|line| {
                    line.strip_prefix("cpu")
                        .and_then(|rest| rest.chars().next())
                        .is_some_and(|c| c.is_ascii_digit())
                })
                .count() as u32
        });

        match from_stat {
            Some(count) if count > 0 => count,
            _ => std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(1),
        }
    }
}

impl SystemSource for ProcfsSystemSource {
    fn device_info(&self) -> ProbeResult<DeviceInfo> {
        let meminfo_content = self.read_file("meminfo")?;
        let meminfo = parser::parse_meminfo(&meminfo_content)?;

        let available = meminfo
            .get("MemAvailable")
            .or_else(|| meminfo.get("MemFree"))
            .copied()
            .ok_or_else(|| ProbeError::Parse("meminfo has no MemAvailable".to_string()))?;

        Ok(DeviceInfo::new(self.cpu_count(), available))
    }
}
