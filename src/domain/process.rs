use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Scheduler state as reported by the OS for one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Running,
    Sleeping,
    Waiting,
    Zombie,
    Stopped,
    TracingStop,
    Dead,
    Unknown,
}

impl ProcessState {
    pub fn from_char(c: char) -> Self {
        match c {
            'R' => Self::Running,
            'S' => Self::Sleeping,
            'D' => Self::Waiting,
            'Z' => Self::Zombie,
            'T' => Self::Stopped,
            't' => Self::TracingStop,
            'X' | 'x' => Self::Dead,
            _ => Self::Unknown,
        }
    }

    /// A zombie or dead process can no longer be sampled.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Zombie | Self::Dead)
    }
}

/// Runtime the target was built against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkKind {
    #[serde(alias = "c")]
    Native,
    #[serde(alias = "c#", alias = "csharp", alias = "dotnet")]
    Clr,
    #[serde(alias = "java")]
    Jvm,
    Node,
    Python,
    #[default]
    Unknown,
}

impl SdkKind {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "c" | "native" => Self::Native,
            "c#" | "csharp" | "clr" | "dotnet" => Self::Clr,
            "java" | "jvm" => Self::Jvm,
            "node" => Self::Node,
            "python" => Self::Python,
            _ => Self::Unknown,
        }
    }

    /// Interpreter that runs a target of this kind, `None` for native binaries.
    pub fn interpreter(&self) -> Option<&'static str> {
        match self {
            Self::Clr => Some("dotnet"),
            Self::Jvm => Some("java"),
            Self::Node => Some("node"),
            Self::Python => Some("python3"),
            Self::Native | Self::Unknown => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Native => "iot-sdk-c",
            Self::Clr => "iot-sdk-csharp",
            Self::Jvm => "iot-sdk-java",
            Self::Node => "iot-sdk-node",
            Self::Python => "iot-sdk-python",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SdkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What a controller supervises: an executable to launch, or a running PID
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessTarget {
    Path(PathBuf),
    Pid(u32),
}

impl fmt::Display for ProcessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Pid(pid) => write!(f, "pid {}", pid),
        }
    }
}

/// Lifecycle of a supervised process.
///
/// `Created -> Starting -> Running -> {Ended, EndedWithError, Terminated}`,
/// with `Failed` reachable from `Starting` when the launch does not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Created,
    Starting,
    Running,
    Ended,
    EndedWithError(i32),
    Terminated,
    Failed,
}

impl LifecycleState {
    fn rank(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Starting => 1,
            Self::Running => 2,
            Self::Ended | Self::EndedWithError(_) | Self::Terminated | Self::Failed => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 3
    }

    /// A live handle owns (or may own) an OS process.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    /// Transitions only move forward; terminal states are final.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("CREATED"),
            Self::Starting => f.write_str("STARTING"),
            Self::Running => f.write_str("RUNNING"),
            Self::Ended => f.write_str("ENDED"),
            Self::EndedWithError(code) => write!(f, "ENDED_WITH_ERROR({})", code),
            Self::Terminated => f.write_str("TERMINATED"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}
