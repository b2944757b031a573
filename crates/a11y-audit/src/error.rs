use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    /// The rule engine could not run against the current page state.
    #[error("Accessibility scan unavailable: {0}")]
    ScanUnavailable(String),

    #[error("Screenshot unavailable: {0}")]
    ScreenshotUnavailable(String),

    #[error("Failed to write report {}: {message}", path.display())]
    RenderFailure { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid scan payload: {0}")]
    InvalidPayload(String),

    /// A page with this label (or one that slugs the same) was already audited.
    #[error("Page already audited: {0}")]
    DuplicateLabel(String),
}

impl AuditError {
    /// Whether the run can carry on past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuditError::ScanUnavailable(_) | AuditError::ScreenshotUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
