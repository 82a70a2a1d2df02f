use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{NetworkCounters, ResourceSample};

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The process exited or never existed; distinct from a zero reading.
    #[error("process {0} is gone")]
    ProcessGone(u32),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[cfg_attr(not(windows), allow(dead_code))]
    #[error("counter query failed: {0}")]
    Counter(String),

    #[cfg_attr(not(windows), allow(dead_code))]
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Outcome of a non-blocking liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    /// Exited with the given status; signals map to `128 + signo`.
    Exited(i32),
    /// Not running and no exit status could be collected.
    Gone,
}

impl Liveness {
    pub fn is_alive(&self) -> bool {
        matches!(self, Self::Alive)
    }
}

/// Port for reading resource counters of a single process
pub trait ResourceProbe {
    /// Check whether `pid` is still running without blocking.
    fn liveness(&mut self, pid: u32) -> Liveness;

    /// Read one complete sample; a failure never yields a partial sample.
    fn sample(&mut self, pid: u32) -> ProbeResult<ResourceSample>;

    /// Read cumulative network traffic visible to `pid`.
    fn network(&mut self, pid: u32) -> ProbeResult<NetworkCounters>;

    /// Find a running process named `image_name` inside process group `group`.
    ///
    /// Only processes descended from our own launch carry the group of the
    /// spawned child, so unrelated processes with the same name never match.
    fn find_pid(&self, image_name: &str, group: u32) -> Option<u32>;

    /// Drop any per-process state (CPU baselines, open queries).
    fn forget(&mut self, _pid: u32) {}
}
