//! Cloud provider error types

use thiserror::Error;

/// Cloud provider errors
///
/// Callers must be able to tell "no such resource" apart from "the backend
/// rejected or lost the operation" and from "the backend is unreachable".
/// Services convert `NotFound` into an absent value at their boundary;
/// `Conflict` is retried internally up to a ceiling before surfacing.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Concurrent modification conflict: {0}")]
    Conflict(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
