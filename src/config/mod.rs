//! Configuration management for nmapi.
//!
//! [`AppSettings`] mirrors the optional JSON settings file; [`AppConfig`] is
//! the validated, immutable configuration the rest of the crate receives.

mod app;
mod settings;

pub use app::{
    AppConfig, ConfigOverrides, ScannerConfig, ScheduleConfig, MAX_INTERVAL, MAX_TIMEOUT,
    MIN_TIMEOUT,
};
pub use settings::{AppSettings, Paths, ScheduleSettings};
