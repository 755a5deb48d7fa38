//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::runner::ScanResult;
use crate::storage::{ScanOutcome, ScanRecord};
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

fn outcome_style(outcome: ScanOutcome) -> Style {
    match outcome {
        ScanOutcome::Success => Style::new().green().bold(),
        ScanOutcome::Timeout => Style::new().yellow(),
        ScanOutcome::Failure | ScanOutcome::Rejected | ScanOutcome::SpawnFailure => {
            Style::new().red()
        }
    }
}

/// Print a completed one-shot scan: a short header, then the tool output
/// verbatim.
pub fn print_scan_result(result: &ScanResult) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out, "  {} {}", style("Target:").bold(), result.target)?;
    writeln!(
        out,
        "  {} {} in {:.2}s",
        style("Status:").bold(),
        outcome_style(ScanOutcome::Success).apply_to(result.exit_status),
        result.duration.as_secs_f64()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    out.write_all(result.output.as_bytes())?;
    if !result.output.ends_with('\n') {
        writeln!(out)?;
    }

    if !result.stderr.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", style("[stderr]").dim())?;
        writeln!(out, "{}", style(result.stderr.trim_end()).dim())?;
    }

    Ok(())
}

/// Print a table of stored scans.
pub fn print_history(records: &[ScanRecord]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if records.is_empty() {
        writeln!(out, "  {}", style("No stored scans.").dim())?;
        return Ok(());
    }

    writeln!(out)?;
    writeln!(
        out,
        "  {:<8}  {:<19}  {:<14}  {:>8}  {}",
        style("ID").bold(),
        style("STARTED").bold(),
        style("OUTCOME").bold(),
        style("TIME").bold(),
        style("TARGET").bold()
    )?;
    writeln!(out, "  {}", style(THIN_RULE).dim())?;

    for record in records {
        writeln!(
            out,
            "  {:<8}  {:<19}  {:<14}  {:>7.1}s  {}",
            style(record.id.short()).dim(),
            record.started_at.format("%Y-%m-%d %H:%M:%S"),
            outcome_style(record.outcome).apply_to(record.outcome.to_string()),
            record.duration_ms as f64 / 1000.0,
            truncate_string(&record.target, 40)
        )?;
    }

    writeln!(out)?;
    Ok(())
}

/// Print one stored scan in full.
pub fn print_record(record: &ScanRecord) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out, "  {} {}", style("Scan ID:").bold(), style(record.id).dim())?;
    writeln!(out, "  {} {}", style("Target:").bold(), record.target)?;
    writeln!(
        out,
        "  {} {}",
        style("Started:").bold(),
        record.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        out,
        "  {} {}",
        style("Outcome:").bold(),
        outcome_style(record.outcome).apply_to(record.outcome)
    )?;
    if let Some(code) = record.exit_code {
        writeln!(out, "  {} {}", style("Exit code:").bold(), code)?;
    }
    if let Some(error) = &record.error {
        writeln!(out, "  {} {}", style("Error:").bold(), error)?;
    }
    writeln!(out, "{}", style(RULE).cyan())?;

    if !record.output.is_empty() {
        writeln!(out)?;
        out.write_all(record.output.as_bytes())?;
        if !record.output.ends_with('\n') {
            writeln!(out)?;
        }
    }
    if !record.stderr.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", style("[stderr]").dim())?;
        writeln!(out, "{}", style(record.stderr.trim_end()).dim())?;
    }

    Ok(())
}

/// Print a header before a one-shot scan begins.
pub fn print_scan_header(target: &str, argv: &[String]) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("nmapi").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{} Target: {}", style("•").dim(), style(target).white().bold());
    println!("{} Command: {}", style("•").dim(), style(argv.join(" ")).yellow());
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate to at most `max_len` characters, adding an ellipsis if cut.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
