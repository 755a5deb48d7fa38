//! Serve subcommand implementation.
//!
//! Runs the HTTP API and, when targets are configured, the background
//! scheduler in the same process until SIGINT/SIGTERM.

use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::error::CliResult;
use crate::scheduler::Scheduler;
use crate::storage::{LogSink, ScanStore};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Serve the HTTP API and run scheduled scans.
#[derive(Parser, Debug, Default)]
pub struct ServeCommand {
    /// Do not start the background scheduler
    #[arg(long)]
    pub no_schedule: bool,
}

impl ServeCommand {
    pub async fn execute(&self, config: Arc<AppConfig>) -> CliResult<()> {
        let cancel = CancellationToken::new();
        tokio::spawn(cancel_on_signal(cancel.clone()));

        let log = Arc::new(LogSink::open(&config.log_file).await?);
        let store = ScanStore::open(&config.results_dir)?;
        info!(
            log_file = %config.log_file.display(),
            results_dir = %config.results_dir.display(),
            nmap = %config.scanner.program.display(),
            "starting"
        );

        let scheduler = match &config.schedule {
            Some(schedule) if !self.no_schedule => {
                let service = config.scanner.service_with_args(schedule.tool_args.clone());
                let scheduler = Scheduler::new(schedule.clone(), service, Arc::clone(&log))
                    .with_store(store.clone());
                Some(tokio::spawn(scheduler.run(cancel.clone())))
            }
            Some(_) => {
                info!("scheduler disabled by --no-schedule");
                None
            }
            None => {
                info!("no scheduled targets configured, scheduler not started");
                None
            }
        };

        let state = AppState::new(config.scanner.service(), &config.log_file)
            .with_log(log)
            .with_store(store);
        let listener = TcpListener::bind(config.bind).await?;
        let served = api::serve(listener, api::router(state), cancel.clone()).await;

        // Whatever stopped the server also stops the scheduler.
        cancel.cancel();
        if let Some(handle) = scheduler {
            if let Err(e) = handle.await {
                error!(error = %e, "scheduler task failed");
            }
        }

        info!("shut down");
        Ok(served?)
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    shutdown_signal().await;
    info!("shutdown requested");
    cancel.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
