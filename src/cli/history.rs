//! History subcommand implementation.
//!
//! Lists, shows and prunes the scan records written by the scheduler.

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::error::CliResult;
use crate::output;
use crate::storage::ScanStore;
use chrono::TimeDelta;
use clap::Parser;

/// View and manage stored scheduled scans.
#[derive(Parser, Debug)]
pub struct HistoryCommand {
    /// Number of recent scans to show
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Show one scan in full (ID or ID prefix)
    #[arg(long, value_name = "SCAN_ID", conflicts_with = "prune")]
    pub show: Option<String>,

    /// Delete scans older than N days
    #[arg(long, value_name = "DAYS")]
    pub prune: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl HistoryCommand {
    pub fn execute(&self, config: &AppConfig, quiet: bool) -> CliResult<()> {
        let store = ScanStore::open(&config.results_dir)?;

        if let Some(days) = self.prune {
            let deleted = store.prune(TimeDelta::days(i64::from(days)))?;
            if !quiet {
                output::print_success(&format!(
                    "Deleted {} scan(s) older than {} day(s)",
                    deleted, days
                ));
            }
            return Ok(());
        }

        if let Some(prefix) = &self.show {
            let record = store.find_by_prefix(prefix)?;
            return match self.output {
                OutputFormat::Plain => Ok(output::print_record(&record)?),
                OutputFormat::Json => Ok(output::print_json(&record)?),
            };
        }

        let records = store.list_recent(self.count)?;
        match self.output {
            OutputFormat::Plain => {
                if !quiet {
                    output::print_info(&format!("Results directory: {}", store.dir().display()));
                }
                output::print_history(&records)?;
            }
            OutputFormat::Json => output::print_json(&records)?,
        }
        Ok(())
    }
}
