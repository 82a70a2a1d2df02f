pub mod format;
pub mod health;
pub mod lifecycle;
pub mod monitoring;
pub mod registry;
pub mod report;

pub use lifecycle::{LifecycleOptions, ProcessController};
pub use monitoring::{AnalysisRun, RunOptions};
pub use report::{Report, ReportMetadata};
