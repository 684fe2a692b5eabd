//! Error types for the capture renderer.

use std::path::PathBuf;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors that can occur while capturing a process into a notebook.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The process script could not be found.
    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    /// The script or its arguments could not be understood.
    #[error(transparent)]
    Core(#[from] flowspect_core::Error),

    /// Failed to write the notebook.
    #[error("Failed to write file {path}: {message}")]
    WriteError { path: PathBuf, message: String },

    /// Failed to serialize the notebook.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
