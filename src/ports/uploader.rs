use thiserror::Error;

use crate::domain::ReportFormat;

#[derive(Debug, Error)]
#[error("upload to {target} failed: {reason}")]
pub struct UploadError {
    pub target: String,
    pub reason: String,
}

/// Port for forwarding a finished report to a remote collector
pub trait ReportUploader {
    fn target(&self) -> &str;

    fn upload(&self, document: &str, format: ReportFormat) -> Result<(), UploadError>;
}
