//! Error types for playrun-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for playrun-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in playrun-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// An external program could not be started at all
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// Program that was being started
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// An external program ran but exited unsuccessfully
    #[error("{step} failed ({})", describe_code(.code))]
    StepFailed {
        /// Name of the phase step that failed
        step: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
    },

    /// pytest finished without writing its JSON report
    #[error("test report was not generated: {}", .path.display())]
    ReportMissing {
        /// Where the report was expected
        path: PathBuf,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl Error {
    /// Exit code of the external program behind this error, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::StepFailed { code, .. } => *code,
            _ => None,
        }
    }
}
