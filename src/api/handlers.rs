//! Route handlers.

use super::{ApiError, AppState};
use crate::error::StorageResult;
use crate::service::ScanRequest;
use crate::storage::{read_log, LogEntry, LogSource, ScanRecord, ScanStore};
use crate::types::{ScanId, ScanIdError};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

/// Successful `POST /scan` body.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub target: String,
    pub output: String,
    pub status: &'static str,
    pub duration_ms: u64,
}

/// `GET /`
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "nmapi is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /scan`
pub async fn scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let outcome = state.service.scan(&request).await;

    if let Some(log) = &state.log {
        let entry = LogEntry::from_outcome(LogSource::Api, request.target.trim(), &outcome);
        if let Err(e) = log.append(&entry).await {
            error!(error = %e, "failed to write scan log");
        }
    }

    let result = outcome?;
    Ok(Json(ScanResponse {
        duration_ms: result.duration_ms(),
        target: result.target,
        output: result.output,
        status: "success",
    }))
}

/// `GET /logs`
pub async fn logs(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match read_log(&state.log_file).await? {
        Some(content) => Ok(Json(json!({ "log": content }))),
        None => Err(ApiError::NotFound("log file not found".to_string())),
    }
}

/// `GET /results`: stored scan ids, newest first.
pub async fn list_results(State(state): State<AppState>) -> Result<Json<Vec<ScanId>>, ApiError> {
    let records = with_store(&state, |store| store.list())
        .await?
        .unwrap_or_default();
    Ok(Json(records.into_iter().map(|r| r.id).collect()))
}

/// `GET /results/latest`
pub async fn latest_result(State(state): State<AppState>) -> Result<Json<ScanRecord>, ApiError> {
    with_store(&state, |store| store.latest())
        .await?
        .flatten()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no scan results found".to_string()))
}

/// `GET /results/{id}`
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScanRecord>, ApiError> {
    let id: ScanId = id
        .parse()
        .map_err(|e: ScanIdError| ApiError::BadRequest(e.to_string()))?;
    with_store(&state, move |store| store.load(&id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("scan not found: {}", id)))
}

/// Run a blocking store operation off the async workers. `None` when no
/// store is configured.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<Option<T>, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ScanStore) -> StorageResult<T> + Send + 'static,
{
    let Some(store) = state.store.clone() else {
        return Ok(None);
    };
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map(Some)
        .map_err(ApiError::from)
}
