//! HTTP layer.
//!
//! Routes:
//! - `GET /`: liveness
//! - `POST /scan`: run an on-demand scan
//! - `GET /logs`: the scan log
//! - `GET /results`, `GET /results/latest`, `GET /results/{id}`: stored
//!   scheduled scans
//!
//! Each request runs on its own task and each scan owns its child process,
//! so concurrent scans proceed in parallel.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::ScanResponse;

use crate::service::ScanService;
use crate::storage::{LogSink, ScanStore};
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    service: ScanService,
    log_file: PathBuf,
    log: Option<Arc<LogSink>>,
    store: Option<ScanStore>,
}

impl AppState {
    pub fn new(service: ScanService, log_file: impl Into<PathBuf>) -> Self {
        Self {
            service,
            log_file: log_file.into(),
            log: None,
            store: None,
        }
    }

    /// Record on-demand scans in the shared scan log.
    pub fn with_log(mut self, log: Arc<LogSink>) -> Self {
        self.log_file = log.path().to_path_buf();
        self.log = Some(log);
        self
    }

    /// Serve stored results from `store`.
    pub fn with_store(mut self, store: ScanStore) -> Self {
        self.store = Some(store);
        self
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/scan", post(handlers::scan))
        .route("/logs", get(handlers::logs))
        .route("/results", get(handlers::list_results))
        .route("/results/latest", get(handlers::latest_result))
        .route("/results/{id}", get(handlers::get_result))
        .with_state(state)
}

/// Serve `router` on `listener` until `cancel` fires, then drain in-flight
/// requests.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
