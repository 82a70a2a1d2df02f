pub mod probe;
pub mod signaller;
pub mod system_source;
pub mod uploader;

pub use probe::{Liveness, ProbeError, ProbeResult, ResourceProbe};
pub use signaller::{ProcessSignaller, SignalError};
pub use system_source::SystemSource;
pub use uploader::{ReportUploader, UploadError};
