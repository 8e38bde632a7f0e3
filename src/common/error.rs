//! Error types for the pfish runner
//!
//! Every variant aborts the run unless keep-going mode is enabled, in which
//! case per-record failures are collected and reported as `RunFailed`.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pfish runner
#[derive(Error, Debug)]
pub enum Error {
    // === Definition Errors ===
    #[error("Failed to parse definition '{path}': {reason}")]
    Parse { path: String, reason: String },

    // === Executor Errors ===
    #[error("pfish failed for '{name}' (category '{category}'): {status}")]
    Execution {
        name: String,
        category: String,
        status: ExitStatus,
    },

    #[error("Failed to start executor '{program}': {source}")]
    ExecutorSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Executor '{program}' not found. Install it or pass --executor <path>")]
    ExecutorNotFound { program: String },

    #[error("Output of '{name}' is not valid UTF-8: {source}")]
    OutputDecode {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    // === Run Errors ===
    #[error("{failed} of {total} definitions failed")]
    RunFailed { failed: usize, total: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a parse error for a definition file
    pub fn parse<P: AsRef<std::path::Path>>(path: P, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error belongs to a single record rather than the whole run
    ///
    /// Only these are isolated in keep-going mode; anything else still aborts.
    pub fn is_per_record(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. }
                | Error::Execution { .. }
                | Error::ExecutorSpawn { .. }
                | Error::OutputDecode { .. }
        )
    }
}
