//! Scan subcommand implementation.
//!
//! Handles `nmapi scan <target>`: one scan through the same validator and
//! runner the HTTP API uses, printed to the terminal.

use crate::api::ScanResponse;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::error::{CliResult, RunError, ScanError};
use crate::output;
use crate::service::ScanRequest;
use crate::types::validate;
use clap::Parser;

/// Scan a single target.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Target to scan (IP, hostname, or CIDR notation)
    ///
    /// Examples:
    ///   192.168.1.1        Single IP address
    ///   scanme.nmap.org    Hostname
    ///   192.168.1.0/24     CIDR range
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl ScanCommand {
    pub async fn execute(&self, config: &AppConfig, quiet: bool) -> CliResult<()> {
        let target = validate(&self.target).map_err(ScanError::from)?;

        if !quiet && self.output == OutputFormat::Plain {
            output::print_scan_header(target.as_str(), &config.scanner.argv(&target));
        }

        let outcome = config
            .scanner
            .service()
            .scan(&ScanRequest::new(target.as_str()))
            .await;

        match (&outcome, self.output) {
            (Ok(result), OutputFormat::Plain) => output::print_scan_result(result)?,
            (Ok(result), OutputFormat::Json) => output::print_json(&ScanResponse {
                target: result.target.clone(),
                output: result.output.clone(),
                status: "success",
                duration_ms: result.duration_ms(),
            })?,
            (Err(ScanError::Run(RunError::ToolFailure { stderr, .. })), _) if !stderr.is_empty() => {
                output::print_warning(stderr.trim_end());
            }
            _ => {}
        }

        outcome.map(|_| ()).map_err(Into::into)
    }
}
