//! Settings file and application paths.
//!
//! Settings are read from a JSON file (an explicit `--config` path or the
//! XDG config directory) with every field optional.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/nmapi)
    pub config_dir: PathBuf,
    /// Data directory (~/.local/share/nmapi)
    pub data_dir: PathBuf,
}

impl Paths {
    /// Resolve the XDG directories. Nothing is created.
    pub fn discover() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("org", "nmapi", "nmapi").ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
            data_dir: project.data_dir().to_path_buf(),
        })
    }

    /// Paths rooted under a single directory.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.to_path_buf(),
            data_dir: root.to_path_buf(),
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("logs").join("daily_scan.log")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.data_dir.join("scan_results")
    }
}

/// Scheduler section of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Targets scanned on every tick, in order.
    pub targets: Vec<String>,
    /// Seconds between ticks.
    pub interval_secs: u64,
    /// Fixed flags for scheduled scans.
    pub tool_args: Vec<String>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            interval_secs: 24 * 60 * 60,
            tool_args: vec!["-sn".to_string()],
        }
    }
}

/// Contents of `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Address the HTTP server listens on.
    pub bind: String,
    /// Scan executable.
    pub nmap_path: PathBuf,
    /// Fixed flags for on-demand scans.
    pub scan_args: Vec<String>,
    /// Per-scan timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum stderr bytes kept per scan.
    pub stderr_limit_bytes: usize,
    pub schedule: ScheduleSettings,
    pub log_file: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            nmap_path: PathBuf::from("nmap"),
            scan_args: vec!["-F".to_string()],
            timeout_secs: 300,
            stderr_limit_bytes: crate::runner::DEFAULT_STDERR_LIMIT,
            schedule: ScheduleSettings::default(),
            log_file: None,
            results_dir: None,
        }
    }
}

impl AppSettings {
    /// Load settings from `explicit` if given (it must exist), otherwise
    /// from the settings file under `paths` if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>, paths: Option<&Paths>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        match paths.map(Paths::settings_file) {
            Some(file) if file.exists() => Self::load_from(&file),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.nmap_path, PathBuf::from("nmap"));
        assert_eq!(settings.scan_args, vec!["-F"]);
        assert_eq!(settings.timeout_secs, 300);
        assert_eq!(settings.schedule.interval_secs, 86400);
        assert!(settings.schedule.targets.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        fs::write(
            &file,
            r#"{"timeout_secs": 60, "schedule": {"targets": ["scanme.nmap.org"]}}"#,
        )
        .unwrap();

        let settings = AppSettings::load(Some(&file), None).unwrap();
        assert_eq!(settings.timeout_secs, 60);
        assert_eq!(settings.schedule.targets, vec!["scanme.nmap.org"]);
        assert_eq!(settings.schedule.tool_args, vec!["-sn"]);
        assert_eq!(settings.bind, "0.0.0.0:8000");
    }

    #[test]
    fn test_load_from_paths_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::rooted(dir.path());
        assert_eq!(
            AppSettings::load(None, Some(&paths)).unwrap(),
            AppSettings::default()
        );

        fs::write(paths.settings_file(), r#"{"nmap_path": "/usr/local/bin/nmap"}"#).unwrap();
        let settings = AppSettings::load(None, Some(&paths)).unwrap();
        assert_eq!(settings.nmap_path, PathBuf::from("/usr/local/bin/nmap"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = AppSettings::load(Some(Path::new("/nonexistent/settings.json")), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        fs::write(&file, "{not json").unwrap();
        assert!(matches!(
            AppSettings::load_from(&file),
            Err(ConfigError::InvalidFormat(_))
        ));
    }
}
