//! Periodic background scans.
//!
//! The scheduler scans every configured target, in order, once per tick and
//! records each outcome in the scan log (and the result store, when one is
//! attached). A failing target never stops the schedule. It runs until its
//! cancellation token fires; a scan in flight at that moment is dropped,
//! which kills the tool process.

use crate::config::ScheduleConfig;
use crate::error::ScanError;
use crate::runner::ScanResult;
use crate::service::{ScanRequest, ScanService};
use crate::storage::{LogEntry, LogSink, LogSource, ScanRecord, ScanStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Observable scheduler state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Waiting { next_tick: Instant },
    Running { target: String },
    Stopped,
}

pub struct Scheduler {
    config: ScheduleConfig,
    service: ScanService,
    log: Arc<LogSink>,
    store: Option<ScanStore>,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig, service: ScanService, log: Arc<LogSink>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            config,
            service,
            log,
            store: None,
            state,
        }
    }

    /// Also persist every outcome as a [`ScanRecord`].
    pub fn with_store(mut self, store: ScanStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Run until `cancel` fires. The first tick is immediate.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            targets = ?self.config.targets,
            interval_secs = self.config.interval.as_secs(),
            "scheduler started"
        );

        let mut next_tick = Instant::now();
        loop {
            self.state.send_replace(SchedulerState::Waiting { next_tick });
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep_until(next_tick) => {}
            }

            if !self.tick(&cancel).await {
                break;
            }

            let now = Instant::now();
            let Some(next) = next_tick_after(next_tick, now, self.config.interval) else {
                error!(
                    interval_secs = self.config.interval.as_secs(),
                    "schedule interval out of range, stopping scheduler"
                );
                break;
            };
            next_tick = next;
            debug!(
                next_in_secs = (next_tick - now).as_secs(),
                "tick complete"
            );
        }

        self.state.send_replace(SchedulerState::Stopped);
        info!("scheduler stopped");
    }

    /// Scan every target once. Returns false if cancelled part way.
    async fn tick(&self, cancel: &CancellationToken) -> bool {
        for target in &self.config.targets {
            if cancel.is_cancelled() {
                return false;
            }
            self.state.send_replace(SchedulerState::Running {
                target: target.clone(),
            });

            let started_at = Utc::now();
            let request = ScanRequest::new(target.as_str());
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return false,
                outcome = self.service.scan(&request) => outcome,
            };
            self.record(target, started_at, &outcome).await;
        }
        true
    }

    async fn record(
        &self,
        target: &str,
        started_at: DateTime<Utc>,
        outcome: &Result<ScanResult, ScanError>,
    ) {
        match outcome {
            Ok(result) => info!(
                scan_target = target,
                duration_ms = result.duration_ms(),
                "scheduled scan completed"
            ),
            Err(e) => warn!(scan_target = target, error = %e, "scheduled scan failed"),
        }

        let entry = LogEntry::from_outcome(LogSource::Scheduler, target, outcome);
        if let Err(e) = self.log.append(&entry).await {
            error!(path = %self.log.path().display(), error = %e, "failed to write scan log");
        }

        if let Some(store) = &self.store {
            let store = store.clone();
            let record = ScanRecord::from_outcome(target, started_at, outcome);
            let saved = tokio::task::spawn_blocking(move || store.save(&record)).await;
            match saved {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "failed to store scan record"),
                Err(e) => error!(error = %e, "scan record writer panicked"),
            }
        }
    }
}

/// The tick after `prev`. A tick that is already due is pushed out to
/// `now + interval` rather than fired back to back. `None` when the result
/// is not representable.
fn next_tick_after(prev: Instant, now: Instant, interval: Duration) -> Option<Instant> {
    match prev.checked_add(interval) {
        Some(next) if next > now => Some(next),
        Some(_) => {
            warn!("scheduled scans overran the interval, delaying next tick");
            now.checked_add(interval)
        }
        None => None,
    }
}
