//! # nmapi - nmap over HTTP, safely
//!
//! nmapi exposes an on-demand network scan endpoint and runs periodic
//! scans of configured targets in the background. Every target is
//! validated before any process is spawned, and the scanner is always
//! invoked with an argument vector, never through a shell.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use nmapi::runner::ProcessRunner;
//! use nmapi::service::{ScanRequest, ScanService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = ProcessRunner::new("nmap", vec!["-F".to_string()]);
//!     let service = ScanService::new(Arc::new(runner));
//!
//!     match service.scan(&ScanRequest::new("scanme.nmap.org")).await {
//!         Ok(result) => print!("{}", result.output),
//!         Err(e) => eprintln!("scan failed: {}", e),
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Validated targets and scan ids
//! - [`runner`] - The `Runner` trait and the process-spawning implementation
//! - [`service`] - Validate-then-run entry point shared by every caller
//! - [`api`] - HTTP routes
//! - [`scheduler`] - Periodic scans with cooperative cancellation
//! - [`storage`] - Scan log and stored scan records
//! - [`config`] - Settings file, environment and command-line merging
//! - [`error`] - Error types
//! - [`output`] - Terminal output for the CLI

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod runner;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, RunError, ScanError, ValidationError};
pub use runner::{ProcessRunner, Runner, ScanResult};
pub use service::{ScanRequest, ScanService};
pub use types::{ScanId, ValidatedTarget};
