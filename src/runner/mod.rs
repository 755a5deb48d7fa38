//! Scan tool invocation.
//!
//! The [`Runner`] trait abstracts how a validated target is turned into a
//! [`ScanResult`], so the service and HTTP layer can be driven by stubs in
//! tests. [`ProcessRunner`] is the real implementation that spawns the
//! external scanner.

mod process;

pub use process::{ProcessRunner, DEFAULT_STDERR_LIMIT};

use crate::error::RunError;
use crate::types::ValidatedTarget;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How the scan tool exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Success,
            _ => Self::Failure,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Output of one completed scan. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// The target as passed to the tool.
    pub target: String,
    /// Tool stdout, verbatim.
    pub output: String,
    /// Tool stderr, possibly truncated.
    pub stderr: String,
    pub exit_status: ExitStatus,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl ScanResult {
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Something that can scan a validated target within a time bound.
///
/// Implementations must not leave any process running once `run` returns
/// or its future is dropped.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, target: &ValidatedTarget, timeout: Duration)
        -> Result<ScanResult, RunError>;
}

/// A shared runner for dynamic dispatch.
pub type SharedRunner = Arc<dyn Runner>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_from_code() {
        assert_eq!(ExitStatus::from_code(Some(0)), ExitStatus::Success);
        assert_eq!(ExitStatus::from_code(Some(1)), ExitStatus::Failure);
        assert_eq!(ExitStatus::from_code(None), ExitStatus::Failure);
    }

    #[test]
    fn test_exit_status_display() {
        assert_eq!(ExitStatus::Success.to_string(), "success");
        assert_eq!(ExitStatus::Failure.to_string(), "failure");
    }
}
