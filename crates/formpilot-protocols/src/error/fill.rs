//! Per-field fill errors.
//!
//! A single field's failure never aborts the pass; the driver catches it,
//! records it by field name, and continues.

use std::path::PathBuf;

use thiserror::Error;

use super::browser::BrowserError;

#[derive(Debug, Error)]
pub enum FillError {
    #[error("No selector resolved for field '{0}'")]
    SelectorNotFound(String),

    #[error("No option matched '{wanted}' (available: {available})")]
    OptionNotMatched { wanted: String, available: String },

    #[error("No resume path configured for upload field")]
    MissingResumePath,

    #[error("Resume file not found: {0}")]
    ResumeFileMissing(PathBuf),

    #[error("Unusable response value for field '{field}': {message}")]
    UnusableValue { field: String, message: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl FillError {
    /// Upload/file failures are tolerated by the success classification.
    pub fn is_file_related(&self) -> bool {
        matches!(
            self,
            FillError::MissingResumePath
                | FillError::ResumeFileMissing(_)
                | FillError::Browser(BrowserError::UploadFailed { .. })
        )
    }
}
