//! Scan service: validate, run, report.
//!
//! The one operation both the HTTP layer and the scheduler go through. There
//! are no retries here; a failed or timed out scan is returned as-is.

use crate::error::ScanError;
use crate::runner::{ScanResult, SharedRunner};
use crate::types::validate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

/// Default bound on a single scan.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Body of `POST /scan`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScanRequest {
    pub target: String,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// Validates targets and hands them to a [`Runner`](crate::runner::Runner).
#[derive(Clone)]
pub struct ScanService {
    runner: SharedRunner,
    timeout: Duration,
}

impl ScanService {
    pub fn new(runner: SharedRunner) -> Self {
        Self {
            runner,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one scan. The runner is never invoked for a rejected target.
    pub async fn scan(&self, req: &ScanRequest) -> Result<ScanResult, ScanError> {
        let target = validate(&req.target).map_err(|e| {
            warn!(scan_target = %req.target.escape_debug(), reason = %e.reason, "rejected scan target");
            e
        })?;

        let span = info_span!("scan", scan_target = %target, kind = %target.kind());
        async move {
            match self.runner.run(&target, self.timeout).await {
                Ok(result) => {
                    info!(duration_ms = result.duration_ms(), "scan completed");
                    Ok(result)
                }
                Err(e) => {
                    warn!(error = %e, "scan failed");
                    Err(e.into())
                }
            }
        }
        .instrument(span)
        .await
    }
}
