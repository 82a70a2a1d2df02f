mod parser;
mod probe;
mod system;

use std::path::PathBuf;

pub use probe::ProcfsProbe;
pub use system::ProcfsSystemSource;

/// Configuration for procfs paths (useful for containers and tests)
#[derive(Debug, Clone)]
pub struct ProcfsConfig {
    pub proc_path: PathBuf,
}

impl ProcfsConfig {
    pub fn new(proc_path: impl Into<PathBuf>) -> Self {
        Self {
            proc_path: proc_path.into(),
        }
    }

    pub fn host() -> Self {
        Self {
            proc_path: PathBuf::from("/proc"),
        }
    }
}

impl Default for ProcfsConfig {
    fn default() -> Self {
        Self::host()
    }
}

/// Combined adapter for the probe and system sources
#[derive(Debug, Clone)]
pub struct ProcfsAdapter {
    config: ProcfsConfig,
}

impl ProcfsAdapter {
    pub fn new(config: ProcfsConfig) -> Self {
        Self { config }
    }

    pub fn with_default_paths() -> Self {
        Self::new(ProcfsConfig::default())
    }

    pub fn probe(&self) -> ProcfsProbe {
        ProcfsProbe::new(self.config.clone())
    }

    pub fn system_source(&self) -> ProcfsSystemSource {
        ProcfsSystemSource::new(self.config.clone())
    }
}
