//! Append-only scan log.
//!
//! Each entry is one JSON object on its own line. Writers share a single
//! file handle behind a mutex and emit every entry with one `write_all`, so
//! concurrent appends never interleave partial lines.

use crate::error::{ScanError, StorageError, StorageResult};
use crate::runner::ScanResult;
use crate::storage::ScanOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Who triggered the logged scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Scheduler,
    Api,
}

/// One line of the scan log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub target: String,
    pub outcome: ScanOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Tool output on success, error description otherwise.
    pub detail: String,
}

impl LogEntry {
    pub fn from_outcome(
        source: LogSource,
        target: impl Into<String>,
        outcome: &Result<ScanResult, ScanError>,
    ) -> Self {
        let (scan_outcome, duration_ms, detail) = match outcome {
            Ok(result) => (
                ScanOutcome::Success,
                Some(result.duration_ms()),
                result.output.clone(),
            ),
            Err(err) => (ScanOutcome::from(err), None, describe_error(err)),
        };

        Self {
            timestamp: Utc::now(),
            source,
            target: target.into(),
            outcome: scan_outcome,
            duration_ms,
            detail,
        }
    }
}

fn describe_error(err: &ScanError) -> String {
    use crate::error::RunError;

    match err {
        ScanError::Run(RunError::ToolFailure { stderr, .. }) if !stderr.is_empty() => {
            format!("{}\n[stderr]\n{}", err, stderr)
        }
        _ => err.to_string(),
    }
}

/// Shared append-only log file.
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogSink {
    /// Open `path` for appending, creating parent directories as needed.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::DirectoryError(format!("{}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line.
    pub async fn append(&self, entry: &LogEntry) -> StorageResult<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    /// The whole log as text, or `None` if the file is gone.
    pub async fn read_all(&self) -> StorageResult<Option<String>> {
        read_log(&self.path).await
    }
}

/// Read a log file written by [`LogSink`].
pub async fn read_log(path: &Path) -> StorageResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
