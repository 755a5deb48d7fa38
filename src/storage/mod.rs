//! Scan persistence.
//!
//! [`LogSink`] is the append-only scan log; [`ScanStore`] keeps one JSON
//! document per scheduled scan.

mod json_store;
mod log_sink;

pub use json_store::{ScanOutcome, ScanRecord, ScanStore};
pub use log_sink::{read_log, LogEntry, LogSink, LogSource};
