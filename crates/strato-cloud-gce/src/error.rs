//! GCE provider error types

use strato_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Metadata fingerprint conflict: {0}")]
    FingerprintConflict(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("API request failed: {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GceError {
    /// Whether the backend rejected a metadata write because the supplied
    /// fingerprint no longer matches the current document.
    pub fn is_fingerprint_conflict(&self) -> bool {
        matches!(self, GceError::FingerprintConflict(_))
    }
}

impl From<GceError> for CloudError {
    fn from(err: GceError) -> Self {
        match err {
            GceError::NotFound(msg) => CloudError::NotFound(msg),
            GceError::FingerprintConflict(msg) | GceError::Conflict(msg) => {
                CloudError::Conflict(msg)
            }
            GceError::InvalidArgument(msg) => CloudError::InvalidArgument(msg),
            GceError::PermissionDenied(msg) => CloudError::PermissionDenied(msg),
            GceError::Http { status, message } => {
                CloudError::BackendUnavailable(format!("{status}: {message}"))
            }
            GceError::Transport(msg) => CloudError::BackendUnavailable(msg),
            GceError::OperationFailed(msg) => CloudError::OperationFailed(msg),
            GceError::Json(err) => CloudError::Json(err),
        }
    }
}

pub type GceResult<T> = std::result::Result<T, GceError>;
