use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::domain::{CpuLoad, NetworkCounters, ResourceSample};
use crate::ports::{
    Liveness, ProbeError, ProbeResult, ProcessSignaller, ResourceProbe, SignalError,
};

use super::parser::{self, CpuStat};
use super::ProcfsConfig;

/// Longest name the kernel keeps in /proc/{pid}/comm
const COMM_LEN: usize = 15;

#[derive(Debug, Clone, Copy)]
struct CpuBaseline {
    process_ticks: u64,
    total_ticks: u64,
}

/// Resource probe backed by /proc
pub struct ProcfsProbe {
    config: ProcfsConfig,
    baselines: HashMap<u32, CpuBaseline>,
}

impl ProcfsProbe {
    pub fn new(config: ProcfsConfig) -> Self {
        Self {
            config,
            baselines: HashMap::new(),
        }
    }

    fn read_pid_file(&self, pid: u32, name: &str) -> ProbeResult<String> {
        let path = self.config.proc_path.join(pid.to_string()).join(name);
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProbeError::ProcessGone(pid),
            _ => ProbeError::Io { path, source: e },
        })
    }

    fn count_fds(&self, pid: u32) -> ProbeResult<u32> {
        let path = self.config.proc_path.join(pid.to_string()).join("fd");
        let entries = fs::read_dir(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProbeError::ProcessGone(pid),
            _ => ProbeError::Io {
                path: path.clone(),
                source: e,
            },
        })?;
        Ok(entries.filter_map(Result::ok).count() as u32)
    }

    fn read_system_cpu(&self) -> Option<CpuStat> {
        let path = self.config.proc_path.join("stat");
        let content = fs::read_to_string(&path)
            .map_err(|e| warn!("Failed to read {}: {}", path.display(), e))
            .ok()?;
        parser::parse_cpu_stat(&content)
            .map_err(|e| warn!("Failed to parse {}: {}", path.display(), e))
            .ok()
    }

    /// Share of all CPU time spent in the process since the previous poll.
    ///
    /// Without a previous poll the share since boot is used instead.
    fn cpu_load(&mut self, pid: u32, process_ticks: u64) -> CpuLoad {
        let Some(system) = self.read_system_cpu() else {
            return CpuLoad::Unknown;
        };
        let total_ticks = system.total();
        let current = CpuBaseline {
            process_ticks,
            total_ticks,
        };

        match self.baselines.insert(pid, current) {
            Some(prev) => {
                let total_delta = total_ticks.saturating_sub(prev.total_ticks);
                let process_delta = process_ticks.saturating_sub(prev.process_ticks);
                if total_delta == 0 {
                    CpuLoad::Unknown
                } else {
                    CpuLoad::measured(100.0 * process_delta as f64 / total_delta as f64)
                }
            }
            None if total_ticks == 0 => CpuLoad::Unknown,
            None => CpuLoad::measured(100.0 * process_ticks as f64 / total_ticks as f64),
        }
    }

    fn proc_entry_alive(&self, pid: u32) -> bool {
        match self.read_pid_file(pid, "stat") {
            Ok(content) => parser::parse_proc_stat(&content)
                .map(|stat| !stat.state.is_gone())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Live member of process group `group`
    fn alive_in_group(&self, pid: u32, group: u32) -> bool {
        self.read_pid_file(pid, "stat")
            .ok()
            .and_then(|content| parser::parse_proc_stat(&content).ok())
            .is_some_and(|stat| stat.pgrp == group && !stat.state.is_gone())
    }

    fn matches_image(&self, pid: u32, image_name: &str) -> bool {
        let short: String = image_name.chars().take(COMM_LEN).collect();
        if let Ok(comm) = self.read_pid_file(pid, "comm") {
            if comm.trim() == short {
                return true;
            }
        }

        // Interpreted targets show up as the interpreter; match on argv[0] and argv[1]
        let cmdline = self.read_pid_file(pid, "cmdline").unwrap_or_default();
        cmdline
            .split('\0')
            .take(2)
            .filter(|arg| !arg.is_empty())
            .any(|arg| Path::new(arg).file_name().is_some_and(|f| f == image_name))
    }
}

impl ResourceProbe for ProcfsProbe {
    fn liveness(&mut self, pid: u32) -> Liveness {
        if pid == 0 || pid > i32::MAX as u32 {
            return Liveness::Gone;
        }

        match waitpid(Pid::from_raw(pid as i32), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => Liveness::Alive,
            Ok(WaitStatus::Exited(_, code)) => {
                debug!(pid, code, "Reaped exited child");
                Liveness::Exited(code)
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                debug!(pid, signal = ?sig, "Reaped signaled child");
                Liveness::Exited(128 + sig as i32)
            }
            Ok(_) => Liveness::Alive,
            Err(Errno::ECHILD) => {
                // Not our child (attached by PID or re-exec'd): fall back to /proc
                if self.proc_entry_alive(pid) {
                    Liveness::Alive
                } else {
                    Liveness::Gone
                }
            }
            Err(e) => {
                warn!(pid, "waitpid failed: {}", e);
                if self.proc_entry_alive(pid) {
                    Liveness::Alive
                } else {
                    Liveness::Gone
                }
            }
        }
    }

    fn sample(&mut self, pid: u32) -> ProbeResult<ResourceSample> {
        let stat_content = self.read_pid_file(pid, "stat")?;
        let stat = parser::parse_proc_stat(&stat_content)?;
        if stat.state.is_gone() {
            return Err(ProbeError::ProcessGone(pid));
        }

        let smaps_content = self.read_pid_file(pid, "smaps")?;
        let pss = parser::parse_smaps_pss(&smaps_content)?;
        let handles = self.count_fds(pid)?;
        let cpu_load = self.cpu_load(pid, stat.cpu_ticks());

        Ok(ResourceSample::new(stat.num_threads, pss, handles, cpu_load).with_virtual(stat.vsize))
    }

    fn network(&mut self, pid: u32) -> ProbeResult<NetworkCounters> {
        let content = self.read_pid_file(pid, "net/dev")?;
        Ok(parser::parse_net_dev(&content)?)
    }

    fn find_pid(&self, image_name: &str, group: u32) -> Option<u32> {
        if group == 0 {
            return None;
        }
        let entries = fs::read_dir(&self.config.proc_path).ok()?;

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().to_string_lossy().parse::<u32>().ok())
            .filter(|pid| self.alive_in_group(*pid, group) && self.matches_image(*pid, image_name))
            .max()
    }

    fn forget(&mut self, pid: u32) {
        self.baselines.remove(&pid);
    }
}

fn send(pid: u32, sig: Signal) -> Result<(), SignalError> {
    if pid == 0 || pid > i32::MAX as u32 {
        return Err(SignalError {
            pid,
            reason: "invalid pid".to_string(),
        });
    }

    match signal::kill(Pid::from_raw(pid as i32), sig) {
        Ok(()) => Ok(()),
        // Already gone: nothing left to stop
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(SignalError {
            pid,
            reason: e.to_string(),
        }),
    }
}

impl ProcessSignaller for ProcfsProbe {
    fn request_stop(&mut self, pid: u32) -> Result<(), SignalError> {
        send(pid, Signal::SIGTERM)
    }

    fn kill(&mut self, pid: u32) -> Result<(), SignalError> {
        send(pid, Signal::SIGKILL)
    }
}
