//! Error types for nmapi.
//!
//! Uses `thiserror` for ergonomic error definitions.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A target string was rejected before any process was spawned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failures of a single scan tool invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("scan timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("scan tool failed ({})", describe_exit(.exit_code))]
    ToolFailure {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to launch '{program}': {reason}")]
    SpawnFailure { program: String, reason: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Error returned by the scan service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Run(#[from] RunError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read config file {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid config format: {0}")]
    InvalidFormat(String),

    #[error("invalid scheduled target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the log sink and result store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("scan not found: {0}")]
    ScanNotFound(String),

    #[error("failed to save: {0}")]
    SaveFailed(String),

    #[error("failed to load: {0}")]
    LoadFailed(String),

    #[error("directory error: {0}")]
    DirectoryError(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for command handlers.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_error_messages() {
        let timeout = RunError::Timeout {
            after: Duration::from_secs(30),
        };
        assert_eq!(timeout.to_string(), "scan timed out after 30s");

        let failure = RunError::ToolFailure {
            exit_code: Some(1),
            stderr: String::new(),
        };
        assert_eq!(failure.to_string(), "scan tool failed (exit code 1)");

        let killed = RunError::ToolFailure {
            exit_code: None,
            stderr: String::new(),
        };
        assert_eq!(killed.to_string(), "scan tool failed (terminated by signal)");
    }

    #[test]
    fn test_scan_error_is_transparent() {
        let err: ScanError = ValidationError::new("target must not be empty").into();
        assert_eq!(err.to_string(), "target must not be empty");
    }
}
