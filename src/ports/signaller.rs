use thiserror::Error;

#[derive(Debug, Error)]
#[error("signal to process {pid} rejected: {reason}")]
pub struct SignalError {
    pub pid: u32,
    pub reason: String,
}

/// Port for stopping a supervised process
pub trait ProcessSignaller {
    /// Ask the process to stop (SIGTERM / TerminateProcess).
    fn request_stop(&mut self, pid: u32) -> Result<(), SignalError>;

    /// Stop the process unconditionally (SIGKILL / TerminateProcess).
    fn kill(&mut self, pid: u32) -> Result<(), SignalError>;
}
