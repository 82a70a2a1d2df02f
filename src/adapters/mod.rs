pub mod binary;
#[cfg(windows)]
pub mod pdh;
#[cfg(target_os = "linux")]
pub mod procfs;
pub mod webhook;

pub use binary::{binary_size, resolve_executable};
#[cfg(windows)]
pub use pdh::{PdhProbe, WindowsSystemSource};
#[cfg(target_os = "linux")]
pub use procfs::ProcfsAdapter;
pub use webhook::WebhookUploader;
