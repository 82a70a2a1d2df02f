pub mod device;
pub mod metrics;
pub mod process;
pub mod report;
pub mod summary;

pub use device::DeviceInfo;
pub use metrics::{CpuLoad, NetworkCounters, ResourceSample};
pub use process::{LifecycleState, ProcessState, ProcessTarget, SdkKind};
pub use report::{Protocol, ReportFormat};
pub use summary::RunSummary;
