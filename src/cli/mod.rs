//! CLI subcommand definitions and handlers.
//!
//! - `nmapi serve` - Run the HTTP API and the background scheduler (default)
//! - `nmapi scan <target>` - Run a single scan and print the result
//! - `nmapi history` - Inspect stored scheduled scans

mod history;
mod scan;
mod serve;

pub use history::HistoryCommand;
pub use scan::ScanCommand;
pub use serve::ServeCommand;

use crate::config::{AppConfig, AppSettings, ConfigOverrides, Paths};
use crate::error::CliResult;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

/// nmapi - run nmap scans over HTTP and on a schedule.
#[derive(Parser, Debug)]
#[command(name = "nmapi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run nmap scans on demand over HTTP and on a schedule", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API and run scheduled scans
    Serve(ServeCommand),

    /// Scan a single target and print the result
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// View stored scheduled scans
    #[command(alias = "h")]
    History(HistoryCommand),
}

/// Settings that can be given on the command line or in the environment.
/// Anything left unset falls back to the settings file, then to defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to a JSON settings file
    #[arg(long = "config", global = true, env = "NMAPI_CONFIG", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, global = true, env = "NMAPI_BIND", value_name = "ADDR")]
    pub bind: Option<String>,

    /// Path to the nmap executable
    #[arg(long, global = true, env = "NMAPI_NMAP_PATH", value_name = "PATH")]
    pub nmap_path: Option<PathBuf>,

    /// Fixed nmap flags for on-demand scans (e.g. "-F -T4")
    #[arg(
        long,
        global = true,
        env = "NMAPI_SCAN_ARGS",
        value_name = "FLAGS",
        allow_hyphen_values = true
    )]
    pub scan_args: Option<String>,

    /// Per-scan timeout in seconds
    #[arg(long, global = true, env = "NMAPI_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Target scanned on every scheduler tick (repeat or comma-separate)
    #[arg(
        long = "schedule-target",
        global = true,
        env = "SCAN_TARGET",
        value_delimiter = ',',
        value_name = "TARGET"
    )]
    pub schedule_targets: Option<Vec<String>>,

    /// Hours between scheduled scans
    #[arg(long, global = true, env = "SCAN_INTERVAL_HOURS", value_name = "HOURS")]
    pub interval_hours: Option<u64>,

    /// Scan log file
    #[arg(long, global = true, env = "NMAPI_LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Directory for stored scan results
    #[arg(long, global = true, env = "NMAPI_RESULTS_DIR", value_name = "DIR")]
    pub results_dir: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind.clone(),
            nmap_path: self.nmap_path.clone(),
            scan_args: self.scan_args.clone(),
            timeout_secs: self.timeout,
            schedule_targets: self.schedule_targets.clone(),
            interval_hours: self.interval_hours,
            log_file: self.log_file.clone(),
            results_dir: self.results_dir.clone(),
        }
    }

    /// Read the settings file and merge these overrides into an [`AppConfig`].
    pub fn load(&self) -> CliResult<AppConfig> {
        let paths = match Paths::discover() {
            Ok(paths) => Some(paths),
            Err(e) => {
                warn!(error = %e, "no XDG directories, using working directory defaults");
                None
            }
        };

        let settings = AppSettings::load(self.config_file.as_deref(), paths.as_ref())?;
        Ok(AppConfig::build(settings, self.overrides(), paths.as_ref())?)
    }
}

/// Output format for terminal results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}
