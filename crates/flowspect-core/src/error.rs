//! Error types for flowspect-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for flowspect-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in flowspect-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to parse Python source.
    #[error("parse error: {0}")]
    Parse(String),

    /// The requested function is not defined in the module.
    #[error("function '{function}' not found in {}", path.display())]
    FunctionNotFound { function: String, path: PathBuf },

    /// A command-only process did not declare its inputs.
    #[error(
        "process '{0}' runs a shell command instead of a Python function, so its inputs cannot be guessed"
    )]
    MissingInputs(String),

    /// A channel specification is internally inconsistent.
    #[error("invalid channel '{channel}': {message}")]
    InvalidChannel { channel: String, message: String },

    /// Two channels feed the same function parameter.
    #[error("channel '{channel}' binds parameter '{param}' of {process}, which another channel already feeds")]
    DuplicateBinding {
        process: String,
        channel: String,
        param: String,
    },

    /// Failed to read or validate the pipeline manifest.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Command line arguments did not match the bound function.
    #[error("argument error: {0}")]
    Arguments(String),

    /// Container image could not be materialized.
    #[error("container error for '{image}': {message}")]
    Container { image: String, message: String },

    /// The external pipeline runner failed.
    #[error("runner error: {0}")]
    Runner(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Render the error with a hint on how to recover from it.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Self::MissingInputs(_) => {
                Some("add an `inputs = [...]` list of Nextflow input statements to the process")
            }
            Self::FunctionNotFound { .. } => {
                Some("set `function = \"...\"` on the process to the name of the Python function")
            }
            Self::InvalidChannel { .. } => Some(
                "list-valued `nextflow` and `python` names must have the same number of entries",
            ),
            Self::DuplicateBinding { .. } => {
                Some("map each Python parameter to one channel; use `None` to drop a variable")
            }
            Self::Container { .. } => Some("check that `singularity` is installed and on PATH"),
            Self::Runner(_) => Some("check that `nextflow` is installed and on PATH"),
            Self::Manifest(_) => Some("see demos/hello/pipeline.toml for a working manifest"),
            _ => None,
        };

        match hint {
            Some(hint) => format!("{self}\n  hint: {hint}"),
            None => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Manifest(e.to_string())
    }
}
