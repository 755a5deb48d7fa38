//! JSON-based scan result storage.
//!
//! Stores each scheduled scan as a separate JSON file named after its
//! [`ScanId`]. Supports listing, loading and pruning.

use crate::error::{RunError, ScanError, StorageError, StorageResult};
use crate::runner::ScanResult;
use crate::types::ScanId;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// How a recorded scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Success,
    Failure,
    Timeout,
    Rejected,
    SpawnFailure,
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Timeout => write!(f, "timeout"),
            Self::Rejected => write!(f, "rejected"),
            Self::SpawnFailure => write!(f, "spawn_failure"),
        }
    }
}

impl From<&ScanError> for ScanOutcome {
    fn from(err: &ScanError) -> Self {
        match err {
            ScanError::Validation(_) => Self::Rejected,
            ScanError::Run(RunError::Timeout { .. }) => Self::Timeout,
            ScanError::Run(RunError::ToolFailure { .. }) => Self::Failure,
            ScanError::Run(RunError::SpawnFailure { .. }) => Self::SpawnFailure,
        }
    }
}

/// A persisted scan record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: ScanId,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub target: String,
    pub outcome: ScanOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Tool stdout, verbatim.
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanRecord {
    /// Build a record from the outcome of one scan started at `started_at`.
    pub fn from_outcome(
        target: impl Into<String>,
        started_at: DateTime<Utc>,
        outcome: &Result<ScanResult, ScanError>,
    ) -> Self {
        let completed_at = Utc::now();
        let elapsed_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;
        let mut record = Self {
            id: ScanId::new(),
            started_at,
            completed_at,
            target: target.into(),
            outcome: ScanOutcome::Success,
            exit_code: None,
            output: String::new(),
            stderr: String::new(),
            duration_ms: elapsed_ms,
            error: None,
        };

        match outcome {
            Ok(result) => {
                record.exit_code = Some(0);
                record.output = result.output.clone();
                record.stderr = result.stderr.clone();
                record.duration_ms = result.duration_ms();
            }
            Err(err) => {
                record.outcome = ScanOutcome::from(err);
                record.error = Some(err.to_string());
                if let ScanError::Run(RunError::ToolFailure { exit_code, stderr }) = err {
                    record.exit_code = *exit_code;
                    record.stderr = stderr.clone();
                }
            }
        }

        record
    }
}

/// JSON file-based scan storage.
#[derive(Debug, Clone)]
pub struct ScanStore {
    scans_dir: PathBuf,
}

impl ScanStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let scans_dir = dir.into();
        fs::create_dir_all(&scans_dir)
            .map_err(|e| StorageError::DirectoryError(format!("{}: {}", scans_dir.display(), e)))?;
        Ok(Self { scans_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.scans_dir
    }

    /// Save a scan record, replacing the file atomically.
    pub fn save(&self, record: &ScanRecord) -> StorageResult<()> {
        let file = self.scan_file(&record.id);
        let tmp = file.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(record)?;

        fs::write(&tmp, content).map_err(|e| StorageError::SaveFailed(e.to_string()))?;
        fs::rename(&tmp, &file).map_err(|e| StorageError::SaveFailed(e.to_string()))
    }

    /// Load a scan record by ID.
    pub fn load(&self, id: &ScanId) -> StorageResult<ScanRecord> {
        let file = self.scan_file(id);

        if !file.exists() {
            return Err(StorageError::ScanNotFound(id.to_string()));
        }

        let content =
            fs::read_to_string(&file).map_err(|e| StorageError::LoadFailed(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| StorageError::LoadFailed(e.to_string()))
    }

    /// Find a scan by a prefix of its ID.
    pub fn find_by_prefix(&self, prefix: &str) -> StorageResult<ScanRecord> {
        let prefix = prefix.to_ascii_lowercase();
        let matches: Vec<ScanId> = self
            .list_ids()?
            .into_iter()
            .filter(|id| id.to_string().starts_with(&prefix))
            .collect();

        match matches.as_slice() {
            [] => Err(StorageError::ScanNotFound(prefix)),
            [id] => self.load(id),
            _ => Err(StorageError::LoadFailed(format!(
                "ambiguous prefix '{}': {} matches",
                prefix,
                matches.len()
            ))),
        }
    }

    /// List all scan IDs (unordered).
    pub fn list_ids(&self) -> StorageResult<Vec<ScanId>> {
        let mut ids = Vec::new();

        for entry in
            fs::read_dir(&self.scans_dir).map_err(|e| StorageError::DirectoryError(e.to_string()))?
        {
            let entry = entry.map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<ScanId>().ok())
                {
                    ids.push(id);
                }
            }
        }

        Ok(ids)
    }

    /// All readable records, most recent first.
    pub fn list(&self) -> StorageResult<Vec<ScanRecord>> {
        let mut records: Vec<ScanRecord> = self
            .list_ids()?
            .iter()
            .filter_map(|id| self.load(id).ok())
            .collect();

        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }

    pub fn list_recent(&self, count: usize) -> StorageResult<Vec<ScanRecord>> {
        let mut records = self.list()?;
        records.truncate(count);
        Ok(records)
    }

    /// The most recent record, if any.
    pub fn latest(&self) -> StorageResult<Option<ScanRecord>> {
        Ok(self.list()?.into_iter().next())
    }

    pub fn delete(&self, id: &ScanId) -> StorageResult<()> {
        let file = self.scan_file(id);

        if !file.exists() {
            return Err(StorageError::ScanNotFound(id.to_string()));
        }

        fs::remove_file(&file).map_err(|e| StorageError::SaveFailed(e.to_string()))
    }

    /// Delete records started before `now - max_age`. Returns how many.
    ///
    /// An age reaching past the earliest representable time matches nothing.
    pub fn prune(&self, max_age: TimeDelta) -> StorageResult<usize> {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return Ok(0);
        };
        let mut deleted = 0;

        for record in self.list()? {
            if record.started_at < cutoff {
                self.delete(&record.id)?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    fn scan_file(&self, id: &ScanId) -> PathBuf {
        self.scans_dir.join(id.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::runner::ExitStatus;
    use std::time::Duration;

    fn success(output: &str) -> Result<ScanResult, ScanError> {
        Ok(ScanResult {
            target: "scanme.nmap.org".to_string(),
            output: output.to_string(),
            stderr: String::new(),
            exit_status: ExitStatus::Success,
            started_at: Utc::now(),
            duration: Duration::from_millis(1500),
        })
    }

    #[test]
    fn test_record_from_success() {
        let record = ScanRecord::from_outcome("scanme.nmap.org", Utc::now(), &success("up\n"));
        assert_eq!(record.outcome, ScanOutcome::Success);
        assert_eq!(record.output, "up\n");
        assert_eq!(record.exit_code, Some(0));
        assert_eq!(record.duration_ms, 1500);
        assert!(record.error.is_none());
    }

    #[test]
    fn test_record_from_errors() {
        let failure: Result<ScanResult, ScanError> = Err(RunError::ToolFailure {
            exit_code: Some(1),
            stderr: "boom".to_string(),
        }
        .into());
        let record = ScanRecord::from_outcome("10.0.0.1", Utc::now(), &failure);
        assert_eq!(record.outcome, ScanOutcome::Failure);
        assert_eq!(record.exit_code, Some(1));
        assert_eq!(record.stderr, "boom");

        let rejected: Result<ScanResult, ScanError> =
            Err(ValidationError::new("target must not be empty").into());
        let record = ScanRecord::from_outcome("", Utc::now(), &rejected);
        assert_eq!(record.outcome, ScanOutcome::Rejected);
        assert_eq!(record.error.as_deref(), Some("target must not be empty"));

        let timeout: Result<ScanResult, ScanError> = Err(RunError::Timeout {
            after: Duration::from_secs(5),
        }
        .into());
        let record = ScanRecord::from_outcome("10.0.0.1", Utc::now(), &timeout);
        assert_eq!(record.outcome, ScanOutcome::Timeout);
    }

    #[test]
    fn test_save_load_and_list_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path().join("results")).unwrap();

        let older = ScanRecord::from_outcome(
            "a.example",
            Utc::now() - chrono::Duration::hours(2),
            &success("older"),
        );
        let newer = ScanRecord::from_outcome("b.example", Utc::now(), &success("newer"));
        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        assert_eq!(store.load(&older.id).unwrap(), older);
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(store.latest().unwrap().unwrap().id, newer.id);
        assert_eq!(store.list_recent(1).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();
        fs::write(dir.path().join("readme.txt"), "hi").unwrap();

        assert!(store.list().unwrap().is_empty());
        assert!(store.latest().unwrap().is_none());
        assert!(matches!(
            store.load(&ScanId::new()),
            Err(StorageError::ScanNotFound(_))
        ));
    }

    #[test]
    fn test_find_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();
        let record = ScanRecord::from_outcome("10.0.0.1", Utc::now(), &success("x"));
        store.save(&record).unwrap();

        let found = store.find_by_prefix(&record.id.short()).unwrap();
        assert_eq!(found.id, record.id);
        assert!(matches!(
            store.find_by_prefix("zzzz"),
            Err(StorageError::ScanNotFound(_))
        ));
    }

    #[test]
    fn test_prune() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();
        let old = ScanRecord::from_outcome(
            "old.example",
            Utc::now() - chrono::Duration::days(10),
            &success(""),
        );
        let fresh = ScanRecord::from_outcome("new.example", Utc::now(), &success(""));
        store.save(&old).unwrap();
        store.save(&fresh).unwrap();

        assert_eq!(store.prune(chrono::Duration::days(7)).unwrap(), 1);
        let remaining = store.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh.id);
    }

    #[test]
    fn test_prune_with_unrepresentable_age_deletes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();
        let record = ScanRecord::from_outcome("old.example", Utc::now(), &success(""));
        store.save(&record).unwrap();

        assert_eq!(store.prune(TimeDelta::days(i64::from(u32::MAX))).unwrap(), 0);
        assert_eq!(store.list_ids().unwrap().len(), 1);
    }
}
