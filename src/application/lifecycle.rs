//! Supervision of one target process: launch or attach, poll, and stop.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::adapters::{binary_size, resolve_executable};
use crate::domain::{LifecycleState, NetworkCounters, ProcessTarget, ResourceSample, SdkKind};
use crate::ports::{Liveness, ProbeError, ProcessSignaller, ResourceProbe, SignalError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    #[error("failed to launch {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no running process for {path} after {waited:?}")]
    PidResolution { path: PathBuf, waited: Duration },

    #[error("{path} exited during startup with status {code}")]
    ExitedDuringStartup { path: PathBuf, code: i32 },

    #[error("cannot {op} a process in state {state}")]
    InvalidState {
        op: &'static str,
        state: LifecycleState,
    },

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("process {0} was still running when its handle was closed")]
    StillActive(u32),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Timing of start-up and shutdown
#[derive(Debug, Clone, Copy)]
pub struct LifecycleOptions {
    /// Delay between spawning and the first liveness check
    pub settle: Duration,
    /// How long to look for a re-exec'd process by name
    pub resolve_timeout: Duration,
    /// Time allowed for a graceful stop before killing
    pub grace: Duration,
    /// Sleep between liveness checks while waiting
    pub poll_step: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(250),
            resolve_timeout: Duration::from_millis(2000),
            grace: Duration::from_millis(2000),
            poll_step: Duration::from_millis(50),
        }
    }
}

/// Called once when the handle reaches a terminal state
pub type EndCallback = Box<dyn FnMut(LifecycleState)>;

pub struct ProcessController<P: ResourceProbe + ProcessSignaller> {
    probe: P,
    target: ProcessTarget,
    sdk: SdkKind,
    state: LifecycleState,
    pid: Option<u32>,
    binary_size: u64,
    on_end: Option<EndCallback>,
    options: LifecycleOptions,
}

impl<P: ResourceProbe + ProcessSignaller> ProcessController<P> {
    /// Handle for an executable that `start` will launch.
    pub fn create(probe: P, path: impl Into<PathBuf>, sdk: SdkKind, on_end: Option<EndCallback>) -> Self {
        Self::with_target(probe, ProcessTarget::Path(path.into()), sdk, on_end)
    }

    /// Handle for a process that is already running.
    pub fn attach(probe: P, pid: u32, sdk: SdkKind, on_end: Option<EndCallback>) -> Self {
        Self::with_target(probe, ProcessTarget::Pid(pid), sdk, on_end)
    }

    fn with_target(probe: P, target: ProcessTarget, sdk: SdkKind, on_end: Option<EndCallback>) -> Self {
        Self {
            probe,
            target,
            sdk,
            state: LifecycleState::Created,
            pid: None,
            binary_size: 0,
            on_end,
            options: LifecycleOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn target(&self) -> &ProcessTarget {
        &self.target
    }

    pub fn sdk(&self) -> SdkKind {
        self.sdk
    }

    pub fn binary_size(&self) -> u64 {
        self.binary_size
    }

    fn transition(&mut self, next: LifecycleState) {
        if !self.state.can_transition_to(next) {
            warn!(process = %self.target, from = %self.state, to = %next, "Ignoring lifecycle regression");
            return;
        }

        info!(process = %self.target, pid = ?self.pid, from = %self.state, to = %next, "Lifecycle transition");
        self.state = next;

        if next.is_terminal() {
            if let Some(pid) = self.pid {
                self.probe.forget(pid);
            }
            if let Some(mut on_end) = self.on_end.take() {
                on_end(next);
            }
        }
    }

    fn mark_exited(&mut self, status: Liveness) {
        match status {
            Liveness::Alive => {}
            Liveness::Exited(0) | Liveness::Gone => self.transition(LifecycleState::Ended),
            Liveness::Exited(code) => self.transition(LifecycleState::EndedWithError(code)),
        }
    }

    /// Launch (or verify the attached) process and move to `Running`.
    ///
    /// Failure leaves the handle in `Failed`; it is not retried.
    pub fn start(&mut self, args: &[String]) -> Result<u32, LifecycleError> {
        if self.state != LifecycleState::Created {
            return Err(LifecycleError::InvalidState {
                op: "start",
                state: self.state,
            });
        }
        self.transition(LifecycleState::Starting);

        let launched = match self.target.clone() {
            ProcessTarget::Pid(pid) => self.verify_attached(pid),
            ProcessTarget::Path(path) => self.launch(&path, args),
        };

        match launched {
            Ok(pid) => {
                self.pid = Some(pid);
                if let ProcessTarget::Path(path) = &self.target {
                    let executable = resolve_executable(path, self.sdk);
                    self.binary_size = binary_size(&executable, self.sdk).unwrap_or_else(|e| {
                        warn!(path = %executable.display(), "Failed to read binary size: {}", e);
                        0
                    });
                }
                self.transition(LifecycleState::Running);
                Ok(pid)
            }
            Err(e) => {
                error!(process = %self.target, "Start failed: {}", e);
                self.transition(LifecycleState::Failed);
                Err(e)
            }
        }
    }

    fn verify_attached(&mut self, pid: u32) -> Result<u32, LifecycleError> {
        match self.probe.liveness(pid) {
            Liveness::Alive => Ok(pid),
            _ => Err(ProbeError::ProcessGone(pid).into()),
        }
    }

    fn launch(&mut self, path: &Path, args: &[String]) -> Result<u32, LifecycleError> {
        let interpreter = self.sdk.interpreter();

        // Bare names are looked up on PATH by the OS
        let needs_file = interpreter.is_some() || path.components().count() > 1;
        if needs_file && !path.exists() {
            return Err(LifecycleError::ExecutableNotFound(path.to_path_buf()));
        }

        let (program, mut command) = match interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(path);
                (PathBuf::from(interpreter), command)
            }
            None => (path.to_path_buf(), Command::new(path)),
        };
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        // Own process group, so a re-exec'd target can be told apart from
        // unrelated processes that share its name
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let child = command.spawn().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LifecycleError::ExecutableNotFound(program.clone()),
            _ => LifecycleError::Spawn {
                path: program.clone(),
                source,
            },
        })?;
        // The exit status is collected through the probe, not the Child
        let child_pid = child.id();
        drop(child);
        debug!(pid = child_pid, program = %program.display(), "Spawned target");

        thread::sleep(self.options.settle);
        match self.probe.liveness(child_pid) {
            Liveness::Alive => Ok(child_pid),
            status => self.resolve_reexec(path, child_pid, status),
        }
    }

    /// The spawned child is gone; look for what it handed over to, by image
    /// name, among the processes of the child's own group.
    fn resolve_reexec(&mut self, path: &Path, child_pid: u32, status: Liveness) -> Result<u32, LifecycleError> {
        let image = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let deadline = Instant::now() + self.options.resolve_timeout;

        loop {
            if let Some(pid) = self.probe.find_pid(&image, child_pid) {
                info!(image = %image, pid, "Resolved re-exec'd target");
                return Ok(pid);
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(self.options.poll_step);
        }

        match status {
            Liveness::Exited(code) => Err(LifecycleError::ExitedDuringStartup {
                path: path.to_path_buf(),
                code,
            }),
            _ => Err(LifecycleError::PidResolution {
                path: path.to_path_buf(),
                waited: self.options.resolve_timeout,
            }),
        }
    }

    /// Whether the process is still running; notices an exit and updates the state.
    pub fn is_active(&mut self) -> bool {
        if let (LifecycleState::Running, Some(pid)) = (self.state, self.pid) {
            let status = self.probe.liveness(pid);
            self.mark_exited(status);
        }
        self.state == LifecycleState::Running
    }

    /// Poll once: a fresh sample while running, `ProcessGone` once the process has exited.
    pub fn get_resource_sample(&mut self) -> Result<ResourceSample, LifecycleError> {
        let pid = self.running_pid("sample")?;

        let status = self.probe.liveness(pid);
        if !status.is_alive() {
            self.mark_exited(status);
            return Err(ProbeError::ProcessGone(pid).into());
        }

        match self.probe.sample(pid) {
            Ok(sample) => Ok(sample.with_binary_size(self.binary_size)),
            Err(ProbeError::ProcessGone(_)) => {
                // Exited between the liveness check and the read
                let status = self.probe.liveness(pid);
                self.mark_exited(status);
                Err(ProbeError::ProcessGone(pid).into())
            }
            Err(e) => {
                warn!(pid, "Sample failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Cumulative network counters of the running process
    pub fn network_counters(&mut self) -> Result<NetworkCounters, LifecycleError> {
        let pid = self.running_pid("read network counters of")?;
        Ok(self.probe.network(pid)?)
    }

    fn running_pid(&self, op: &'static str) -> Result<u32, LifecycleError> {
        match (self.state, self.pid) {
            (LifecycleState::Running, Some(pid)) => Ok(pid),
            (state, pid) if state.is_terminal() => Err(ProbeError::ProcessGone(pid.unwrap_or(0)).into()),
            (state, _) => Err(LifecycleError::InvalidState { op, state }),
        }
    }

    fn wait_for_exit(&mut self, pid: u32, timeout: Duration) -> Option<Liveness> {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.probe.liveness(pid);
            if !status.is_alive() {
                return Some(status);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(self.options.poll_step);
        }
    }

    /// Stop the process: graceful request, grace period, then kill.
    ///
    /// A no-op for handles that never started or already ended.
    pub fn end(&mut self) -> Result<(), LifecycleError> {
        let pid = match (self.state, self.pid) {
            (LifecycleState::Running, Some(pid)) => pid,
            (state, _) => {
                debug!(process = %self.target, %state, "Nothing to end");
                return Ok(());
            }
        };

        let status = self.probe.liveness(pid);
        if !status.is_alive() {
            self.mark_exited(status);
            return Ok(());
        }

        if let Err(e) = self.probe.request_stop(pid) {
            warn!(pid, "Graceful stop rejected: {}", e);
        }

        if self.wait_for_exit(pid, self.options.grace).is_none() {
            warn!(pid, grace = ?self.options.grace, "Process ignored stop request, killing");
            self.force_stop(pid)?;
            return Ok(());
        }

        self.transition(LifecycleState::Terminated);
        Ok(())
    }

    fn force_stop(&mut self, pid: u32) -> Result<(), LifecycleError> {
        self.probe.kill(pid).map_err(|e| {
            error!(pid, "Kill rejected: {}", e);
            e
        })?;
        if self.wait_for_exit(pid, self.options.grace).is_none() {
            warn!(pid, "Process not reaped after kill");
        }
        self.transition(LifecycleState::Terminated);
        Ok(())
    }

    /// Release the handle. Closing a live handle is a caller bug: the process
    /// is killed and `StillActive` returned.
    pub fn close(mut self) -> Result<(), LifecycleError> {
        if !self.is_active() {
            return Ok(());
        }
        let pid = self.pid.unwrap_or(0);
        error!(pid, process = %self.target, "Handle closed while process is running");
        self.force_stop(pid)?;
        Err(LifecycleError::StillActive(pid))
    }
}

impl<P: ResourceProbe + ProcessSignaller> Drop for ProcessController<P> {
    fn drop(&mut self) {
        if let (LifecycleState::Running, Some(pid)) = (self.state, self.pid) {
            if self.probe.liveness(pid).is_alive() {
                error!(pid, process = %self.target, "Handle dropped while process is running, killing");
                if let Err(e) = self.force_stop(pid) {
                    error!(pid, "{}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CpuLoad;
    use std::cell::RefCell;
    use std::rc::Rc;

    const PID: u32 = 4242;

    struct Script {
        alive: bool,
        exit: Liveness,
        ignore_stop: bool,
        stops: u32,
        kills: u32,
        found: Option<u32>,
        searched_group: Option<u32>,
    }

    impl Default for Script {
        fn default() -> Self {
            Self {
                alive: true,
                exit: Liveness::Exited(0),
                ignore_stop: false,
                stops: 0,
                kills: 0,
                found: None,
                searched_group: None,
            }
        }
    }

    #[derive(Clone, Default)]
    struct ScriptedProbe(Rc<RefCell<Script>>);

    impl ScriptedProbe {
        fn exit_with(&self, status: Liveness) {
            let mut script = self.0.borrow_mut();
            script.alive = false;
            script.exit = status;
        }
    }

    impl ResourceProbe for ScriptedProbe {
        fn liveness(&mut self, _pid: u32) -> Liveness {
            let script = self.0.borrow();
            if script.alive {
                Liveness::Alive
            } else {
                script.exit
            }
        }

        fn sample(&mut self, pid: u32) -> Result<ResourceSample, ProbeError> {
            if self.0.borrow().alive {
                Ok(ResourceSample::new(3, 4096, 5, CpuLoad::Measured(1.5)))
            } else {
                Err(ProbeError::ProcessGone(pid))
            }
        }

        fn network(&mut self, _pid: u32) -> Result<NetworkCounters, ProbeError> {
            Ok(NetworkCounters::new(10, 1, 20, 2))
        }

        fn find_pid(&self, _image_name: &str, group: u32) -> Option<u32> {
            let mut script = self.0.borrow_mut();
            script.searched_group = Some(group);
            script.found
        }
    }

    impl ProcessSignaller for ScriptedProbe {
        fn request_stop(&mut self, _pid: u32) -> Result<(), SignalError> {
            let mut script = self.0.borrow_mut();
            script.stops += 1;
            if !script.ignore_stop {
                script.alive = false;
                script.exit = Liveness::Exited(143);
            }
            Ok(())
        }

        fn kill(&mut self, _pid: u32) -> Result<(), SignalError> {
            let mut script = self.0.borrow_mut();
            script.kills += 1;
            script.alive = false;
            script.exit = Liveness::Exited(137);
            Ok(())
        }
    }

    fn fast() -> LifecycleOptions {
        LifecycleOptions {
            settle: Duration::from_millis(50),
            resolve_timeout: Duration::from_millis(50),
            grace: Duration::from_millis(50),
            poll_step: Duration::from_millis(5),
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<LifecycleState>>>, Option<EndCallback>) {
        let ended = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&ended);
        let callback: EndCallback = Box::new(move |state| sink.borrow_mut().push(state));
        (ended, Some(callback))
    }

    fn attached(probe: &ScriptedProbe, on_end: Option<EndCallback>) -> ProcessController<ScriptedProbe> {
        let mut controller =
            ProcessController::attach(probe.clone(), PID, SdkKind::Native, on_end).with_options(fast());
        controller.start(&[]).unwrap();
        controller
    }

    #[test]
    fn test_attach_and_sample() {
        let probe = ScriptedProbe::default();
        let mut controller = attached(&probe, None);

        assert_eq!(controller.state(), LifecycleState::Running);
        assert_eq!(controller.pid(), Some(PID));
        assert!(controller.is_active());
        let sample = controller.get_resource_sample().unwrap();
        assert_eq!(sample.threads, 3);
        assert_eq!(controller.network_counters().unwrap().bytes_recv, 20);
        controller.end().unwrap();
    }

    #[test]
    fn test_natural_exit_ends_and_reports_gone() {
        let probe = ScriptedProbe::default();
        let (ended, on_end) = recorder();
        let mut controller = attached(&probe, on_end);

        controller.get_resource_sample().unwrap();
        probe.exit_with(Liveness::Exited(0));

        assert!(matches!(
            controller.get_resource_sample(),
            Err(LifecycleError::Probe(ProbeError::ProcessGone(PID)))
        ));
        assert_eq!(controller.state(), LifecycleState::Ended);
        assert!(!controller.is_active());
        // still gone, never a stale sample
        assert!(matches!(
            controller.get_resource_sample(),
            Err(LifecycleError::Probe(ProbeError::ProcessGone(PID)))
        ));
        assert_eq!(*ended.borrow(), vec![LifecycleState::Ended]);
    }

    #[test]
    fn test_nonzero_exit_is_error_state() {
        let probe = ScriptedProbe::default();
        let mut controller = attached(&probe, None);
        probe.exit_with(Liveness::Exited(3));

        assert!(!controller.is_active());
        assert_eq!(controller.state(), LifecycleState::EndedWithError(3));
        // ending an already ended process changes nothing
        controller.end().unwrap();
        assert_eq!(controller.state(), LifecycleState::EndedWithError(3));
        assert_eq!(probe.0.borrow().stops, 0);
    }

    #[test]
    fn test_end_graceful_is_idempotent() {
        let probe = ScriptedProbe::default();
        let (ended, on_end) = recorder();
        let mut controller = attached(&probe, on_end);

        controller.end().unwrap();
        assert_eq!(controller.state(), LifecycleState::Terminated);
        controller.end().unwrap();

        let script = probe.0.borrow();
        assert_eq!(script.stops, 1);
        assert_eq!(script.kills, 0);
        assert_eq!(*ended.borrow(), vec![LifecycleState::Terminated]);
    }

    #[test]
    fn test_end_kills_after_grace() {
        let probe = ScriptedProbe::default();
        probe.0.borrow_mut().ignore_stop = true;
        let mut controller = attached(&probe, None);

        controller.end().unwrap();
        assert_eq!(controller.state(), LifecycleState::Terminated);
        assert_eq!(probe.0.borrow().stops, 1);
        assert_eq!(probe.0.borrow().kills, 1);
    }

    #[test]
    fn test_end_before_start_is_noop() {
        let probe = ScriptedProbe::default();
        let mut controller = ProcessController::attach(probe.clone(), PID, SdkKind::Native, None);
        controller.end().unwrap();
        assert_eq!(controller.state(), LifecycleState::Created);
        assert!(!controller.is_active());
        assert_eq!(probe.0.borrow().stops, 0);
    }

    #[test]
    fn test_attach_to_dead_process_fails() {
        let probe = ScriptedProbe::default();
        probe.exit_with(Liveness::Gone);
        let (ended, on_end) = recorder();
        let mut controller = ProcessController::attach(probe.clone(), PID, SdkKind::Native, on_end);

        assert!(matches!(controller.start(&[]), Err(LifecycleError::Probe(_))));
        assert_eq!(controller.state(), LifecycleState::Failed);
        assert!(!controller.is_active());
        assert_eq!(*ended.borrow(), vec![LifecycleState::Failed]);
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let probe = ScriptedProbe::default();
        let mut controller = attached(&probe, None);
        assert!(matches!(
            controller.start(&[]),
            Err(LifecycleError::InvalidState { op: "start", .. })
        ));
    }

    #[test]
    fn test_close_live_handle_kills() {
        let probe = ScriptedProbe::default();
        let controller = attached(&probe, None);
        assert!(matches!(controller.close(), Err(LifecycleError::StillActive(PID))));
        assert_eq!(probe.0.borrow().kills, 1);
    }

    #[test]
    fn test_drop_live_handle_kills() {
        let probe = ScriptedProbe::default();
        {
            let _controller = attached(&probe, None);
        }
        assert_eq!(probe.0.borrow().kills, 1);
    }

    #[test]
    fn test_close_after_end_is_ok() {
        let probe = ScriptedProbe::default();
        let mut controller = attached(&probe, None);
        controller.end().unwrap();
        assert!(controller.close().is_ok());
        assert_eq!(probe.0.borrow().kills, 0);
    }

    #[cfg(target_os = "linux")]
    mod linux {
        use super::*;
        use crate::adapters::procfs::{ProcfsConfig, ProcfsProbe};
        use std::process::Command;

        fn host_probe() -> ProcfsProbe {
            ProcfsProbe::new(ProcfsConfig::host())
        }

        #[test]
        fn test_nonexistent_path_fails_to_start() {
            let mut controller =
                ProcessController::create(host_probe(), "/nonexistent/dir/app", SdkKind::Native, None)
                    .with_options(fast());

            assert!(matches!(
                controller.start(&[]),
                Err(LifecycleError::ExecutableNotFound(_))
            ));
            assert_eq!(controller.state(), LifecycleState::Failed);
            assert!(!controller.is_active());
            assert!(controller.pid().is_none());
            controller.end().unwrap();
        }

        #[test]
        fn test_missing_script_for_interpreter_fails() {
            let mut controller =
                ProcessController::create(host_probe(), "missing_script.py", SdkKind::Python, None)
                    .with_options(fast());
            assert!(matches!(
                controller.start(&[]),
                Err(LifecycleError::ExecutableNotFound(_))
            ));
        }

        #[test]
        fn test_start_and_end_real_process() {
            let mut controller = ProcessController::create(host_probe(), "sleep", SdkKind::Native, None)
                .with_options(LifecycleOptions {
                    settle: Duration::from_millis(100),
                    ..LifecycleOptions::default()
                });

            let pid = controller.start(&["30".to_string()]).unwrap();
            assert!(pid > 0);
            // found on PATH, sized from the resolved executable
            assert!(controller.binary_size() > 0);
            assert!(controller.is_active());
            let sample = controller.get_resource_sample().unwrap();
            assert!(sample.threads >= 1);
            assert!(sample.memory_bytes > 0);

            controller.end().unwrap();
            assert_eq!(controller.state(), LifecycleState::Terminated);
            assert!(!controller.is_active());
        }

        #[test]
        fn test_exited_child_does_not_adopt_same_name_process() {
            let mut bystander = Command::new("sleep").arg("30").spawn().unwrap();

            let mut controller = ProcessController::create(host_probe(), "sleep", SdkKind::Native, None)
                .with_options(LifecycleOptions {
                    settle: Duration::from_millis(300),
                    ..fast()
                });
            let result = controller.start(&["0".to_string()]);

            assert!(
                matches!(result, Err(LifecycleError::ExitedDuringStartup { code: 0, .. })),
                "unexpected start result: {:?}",
                result
            );
            assert_eq!(controller.state(), LifecycleState::Failed);
            assert!(controller.pid().is_none());
            assert!(bystander.try_wait().unwrap().is_none());

            bystander.kill().unwrap();
            bystander.wait().unwrap();
        }

        #[test]
        fn test_reexec_lookup_is_scoped_to_child_group() {
            let probe = ScriptedProbe::default();
            {
                let mut script = probe.0.borrow_mut();
                script.alive = false;
                script.exit = Liveness::Gone;
                script.found = Some(PID);
            }

            let mut controller = ProcessController::create(probe.clone(), "sleep", SdkKind::Native, None)
                .with_options(fast());
            assert_eq!(controller.start(&["0".to_string()]).unwrap(), PID);

            let group = probe.0.borrow().searched_group.unwrap();
            assert!(group > 0);
            assert_ne!(group, std::process::id());
        }

        #[test]
        fn test_real_process_exit_code() {
            let mut controller = ProcessController::create(host_probe(), "sh", SdkKind::Native, None)
                .with_options(LifecycleOptions {
                    settle: Duration::from_millis(50),
                    ..LifecycleOptions::default()
                });
            controller
                .start(&["-c".to_string(), "sleep 1; exit 3".to_string()])
                .unwrap();

            let deadline = Instant::now() + Duration::from_secs(10);
            while controller.is_active() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(100));
            }
            assert_eq!(controller.state(), LifecycleState::EndedWithError(3));
            assert!(matches!(
                controller.get_resource_sample(),
                Err(LifecycleError::Probe(ProbeError::ProcessGone(_)))
            ));
        }
    }
}
