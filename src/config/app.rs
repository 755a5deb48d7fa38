//! Immutable runtime configuration.
//!
//! [`AppConfig`] is assembled once at startup from the settings file and
//! command-line/environment overrides, validated, and then passed explicitly
//! (as `Arc<AppConfig>`) to the scan service, scheduler and HTTP layer.

use super::settings::{AppSettings, Paths};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::ProcessRunner;
use crate::service::ScanService;
use crate::types::{validate, ValidatedTarget};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Bounds on the per-scan timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Longest accepted schedule interval (one leap year).
pub const MAX_INTERVAL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub nmap_path: Option<PathBuf>,
    /// Whitespace-separated flag list.
    pub scan_args: Option<String>,
    pub timeout_secs: Option<u64>,
    pub schedule_targets: Option<Vec<String>>,
    pub interval_hours: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
}

/// How to invoke the scan executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub stderr_limit: usize,
}

impl ScannerConfig {
    /// A scan service running `program <args...> <target>`.
    pub fn service(&self) -> ScanService {
        self.service_with_args(self.args.clone())
    }

    /// Same executable and limits with a different fixed flag set.
    pub fn service_with_args(&self, args: Vec<String>) -> ScanService {
        ScanService::new(Arc::new(self.runner(args))).with_timeout(self.timeout)
    }

    /// The command line an on-demand scan of `target` executes.
    pub fn argv(&self, target: &ValidatedTarget) -> Vec<String> {
        self.runner(self.args.clone()).argv(target)
    }

    fn runner(&self, args: Vec<String>) -> ProcessRunner {
        ProcessRunner::new(self.program.clone(), args).with_stderr_limit(self.stderr_limit)
    }
}

/// Background schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Targets scanned on every tick, in order.
    pub targets: Vec<String>,
    pub interval: Duration,
    /// Fixed flags for scheduled scans.
    pub tool_args: Vec<String>,
}

/// Validated process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub scanner: ScannerConfig,
    /// `None` when no targets are configured.
    pub schedule: Option<ScheduleConfig>,
    pub log_file: PathBuf,
    pub results_dir: PathBuf,
}

impl AppConfig {
    /// Merge settings with overrides and validate the result.
    ///
    /// `paths` supplies default locations for the log file and results
    /// directory; without it they are relative to the working directory.
    pub fn build(
        settings: AppSettings,
        overrides: ConfigOverrides,
        paths: Option<&Paths>,
    ) -> ConfigResult<Self> {
        let bind_str = overrides.bind.unwrap_or(settings.bind);
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address '{}'", bind_str)))?;

        let program = overrides.nmap_path.unwrap_or(settings.nmap_path);
        if program.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("scan executable path is empty".to_string()));
        }

        let args = match overrides.scan_args {
            Some(raw) => raw.split_whitespace().map(str::to_string).collect(),
            None => settings.scan_args,
        };
        check_args("scan_args", &args)?;

        let timeout = Duration::from_secs(overrides.timeout_secs.unwrap_or(settings.timeout_secs));
        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&timeout) {
            return Err(ConfigError::Invalid(format!(
                "timeout must be between {}s and {}s, got {}s",
                MIN_TIMEOUT.as_secs(),
                MAX_TIMEOUT.as_secs(),
                timeout.as_secs()
            )));
        }

        if settings.stderr_limit_bytes == 0 {
            return Err(ConfigError::Invalid(
                "stderr_limit_bytes must be greater than zero".to_string(),
            ));
        }

        let targets: Vec<String> = overrides
            .schedule_targets
            .unwrap_or(settings.schedule.targets)
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        for target in &targets {
            validate(target).map_err(|e| ConfigError::InvalidTarget {
                target: target.clone(),
                reason: e.reason,
            })?;
        }

        let interval = match overrides.interval_hours {
            Some(hours) => Duration::from_secs(hours.saturating_mul(60 * 60)),
            None => Duration::from_secs(settings.schedule.interval_secs),
        };
        check_args("schedule.tool_args", &settings.schedule.tool_args)?;

        let schedule = if targets.is_empty() {
            None
        } else {
            if interval.is_zero() {
                return Err(ConfigError::Invalid(
                    "schedule interval must be greater than zero".to_string(),
                ));
            }
            if interval > MAX_INTERVAL {
                return Err(ConfigError::Invalid(format!(
                    "schedule interval must be at most {} hours",
                    MAX_INTERVAL.as_secs() / 3600
                )));
            }
            Some(ScheduleConfig {
                targets,
                interval,
                tool_args: settings.schedule.tool_args,
            })
        };

        let log_file = overrides
            .log_file
            .or(settings.log_file)
            .unwrap_or_else(|| match paths {
                Some(paths) => paths.log_file(),
                None => PathBuf::from("logs").join("daily_scan.log"),
            });
        let results_dir = overrides
            .results_dir
            .or(settings.results_dir)
            .unwrap_or_else(|| match paths {
                Some(paths) => paths.results_dir(),
                None => PathBuf::from("scan_results"),
            });

        Ok(Self {
            bind,
            scanner: ScannerConfig {
                program,
                args,
                timeout,
                stderr_limit: settings.stderr_limit_bytes,
            },
            schedule,
            log_file,
            results_dir,
        })
    }
}

fn check_args(name: &str, args: &[String]) -> ConfigResult<()> {
    if args.iter().any(|a| a.is_empty()) {
        return Err(ConfigError::Invalid(format!("{} contains an empty argument", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_defaults() {
        let config =
            AppConfig::build(AppSettings::default(), ConfigOverrides::default(), None).unwrap();

        assert_eq!(config.bind, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.scanner.program, PathBuf::from("nmap"));
        assert_eq!(config.scanner.args, vec!["-F"]);
        assert_eq!(config.scanner.timeout, Duration::from_secs(300));
        assert!(config.schedule.is_none());
        assert_eq!(config.log_file, Path::new("logs/daily_scan.log"));
        assert_eq!(config.results_dir, Path::new("scan_results"));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConfigOverrides {
            bind: Some("127.0.0.1:9000".to_string()),
            nmap_path: Some(PathBuf::from("/opt/nmap/bin/nmap")),
            scan_args: Some("-sV  -T4".to_string()),
            timeout_secs: Some(30),
            schedule_targets: Some(vec!["scanme.nmap.org".to_string(), " ".to_string()]),
            interval_hours: Some(6),
            log_file: Some(PathBuf::from("/var/log/nmapi.log")),
            results_dir: None,
        };
        let config = AppConfig::build(AppSettings::default(), overrides, None).unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.scanner.args, vec!["-sV", "-T4"]);
        assert_eq!(config.scanner.timeout, Duration::from_secs(30));
        let schedule = config.schedule.unwrap();
        assert_eq!(schedule.targets, vec!["scanme.nmap.org"]);
        assert_eq!(schedule.interval, Duration::from_secs(6 * 3600));
        assert_eq!(schedule.tool_args, vec!["-sn"]);
        assert_eq!(config.log_file, PathBuf::from("/var/log/nmapi.log"));
    }

    #[test]
    fn test_paths_supply_default_locations() {
        let paths = Paths::rooted("/data/nmapi");
        let config =
            AppConfig::build(AppSettings::default(), ConfigOverrides::default(), Some(&paths))
                .unwrap();
        assert_eq!(config.log_file, Path::new("/data/nmapi/logs/daily_scan.log"));
        assert_eq!(config.results_dir, Path::new("/data/nmapi/scan_results"));
    }

    #[test]
    fn test_rejects_invalid_scheduled_target() {
        let overrides = ConfigOverrides {
            schedule_targets: Some(vec!["ok.example".to_string(), "; reboot".to_string()]),
            ..Default::default()
        };
        let err = AppConfig::build(AppSettings::default(), overrides, None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTarget { ref target, .. } if target == "; reboot"));
    }

    #[test]
    fn test_rejects_out_of_range_timeout() {
        for secs in [0, 3601] {
            let overrides = ConfigOverrides {
                timeout_secs: Some(secs),
                ..Default::default()
            };
            assert!(AppConfig::build(AppSettings::default(), overrides, None).is_err());
        }
    }

    #[test]
    fn test_rejects_zero_interval_with_targets() {
        let overrides = ConfigOverrides {
            schedule_targets: Some(vec!["10.0.0.1".to_string()]),
            interval_hours: Some(0),
            ..Default::default()
        };
        assert!(AppConfig::build(AppSettings::default(), overrides, None).is_err());
    }

    #[test]
    fn test_rejects_oversized_interval() {
        let targets = Some(vec!["10.0.0.1".to_string()]);
        for hours in [u64::MAX, MAX_INTERVAL.as_secs() / 3600 + 1] {
            let overrides = ConfigOverrides {
                schedule_targets: targets.clone(),
                interval_hours: Some(hours),
                ..Default::default()
            };
            assert!(matches!(
                AppConfig::build(AppSettings::default(), overrides, None),
                Err(ConfigError::Invalid(_))
            ));
        }

        let mut settings = AppSettings::default();
        settings.schedule.targets = vec!["10.0.0.1".to_string()];
        settings.schedule.interval_secs = u64::MAX;
        assert!(AppConfig::build(settings, ConfigOverrides::default(), None).is_err());

        let overrides = ConfigOverrides {
            schedule_targets: targets,
            interval_hours: Some(MAX_INTERVAL.as_secs() / 3600),
            ..Default::default()
        };
        let config = AppConfig::build(AppSettings::default(), overrides, None).unwrap();
        assert_eq!(config.schedule.unwrap().interval, MAX_INTERVAL);
    }

    #[test]
    fn test_argv_uses_configured_program_and_flags() {
        let overrides = ConfigOverrides {
            nmap_path: Some(PathBuf::from("/usr/bin/nmap")),
            scan_args: Some("-sV -T4".to_string()),
            ..Default::default()
        };
        let config = AppConfig::build(AppSettings::default(), overrides, None).unwrap();
        let target = validate("scanme.nmap.org").unwrap();
        assert_eq!(
            config.scanner.argv(&target),
            vec!["/usr/bin/nmap", "-sV", "-T4", "scanme.nmap.org"]
        );
    }

    #[test]
    fn test_rejects_bad_bind() {
        let overrides = ConfigOverrides {
            bind: Some("localhost".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            AppConfig::build(AppSettings::default(), overrides, None),
            Err(ConfigError::Invalid(_))
        ));
    }
}
