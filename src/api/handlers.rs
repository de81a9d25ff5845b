//! HTTP request handlers.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::core::{CreateTask, DEFAULT_LATEST_LIMIT};
use crate::domain::{TaskFilter, TaskPatch, TaskSummary};

use super::error::ApiResult;
use super::AppState;

/// Service name reported by the health check
pub const SERVICE_NAME: &str = "orbit-bridge";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    limit: Option<String>,
}

/// Leading digits of `raw`; anything missing, unparsable or zero means the default
fn parse_limit(raw: Option<&str>) -> usize {
    let digits: String = raw
        .unwrap_or_default()
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();

    match digits.parse::<usize>() {
        Ok(limit) if limit > 0 => limit,
        _ => DEFAULT_LATEST_LIMIT,
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    #[serde(default)]
    ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    project_id: Option<String>,
}

// ============================================================================
// Health
// ============================================================================

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let mut features = vec!["keyword_classification", "task_derivation"];
    if state.orchestrator.transcription_enabled() {
        features.push("voice_transcription");
    }

    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "features": features,
    }))
}

// ============================================================================
// Webhook
// ============================================================================

/// Acknowledge first, process in the background.
///
/// Always 200: the platform retries anything else, and downstream failures
/// are only logged.
pub async fn telegram_webhook(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    match serde_json::from_slice::<Value>(&body) {
        Ok(update) => {
            let accepted = state.orchestrator.accept(update);
            info!(delivery_id = %accepted.delivery_id, "Accepted webhook delivery");
        }
        Err(e) => warn!(error = %e, "Ignoring webhook body that is not JSON"),
    }
    Json(json!({ "ok": true }))
}

// ============================================================================
// Messages
// ============================================================================

pub async fn unread_messages(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let messages = state.queries.unread_messages().await?;
    Ok(Json(json!({ "count": messages.len(), "messages": messages })))
}

pub async fn latest_messages(
    State(state): State<AppState>,
    params: Result<Query<LatestParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let limit = parse_limit(params.limit.as_deref());
    let messages = state.queries.latest_messages(Some(limit)).await?;
    Ok(Json(json!({ "count": messages.len(), "messages": messages })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    request: Result<Json<MarkReadRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = request?;
    let updated = state.queries.mark_read(&request.ids).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

pub async fn assign_message(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    request: Result<Json<AssignRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(request) = request?;
    let project_id = request.project_id.unwrap_or_default();
    state.queries.assign_message(id, &project_id).await?;
    Ok(Json(json!({ "success": true })))
}

// ============================================================================
// Tasks
// ============================================================================

pub async fn list_tasks(
    State(state): State<AppState>,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(filter) = filter?;
    let tasks = state.queries.list_tasks(&filter).await?;
    Ok(Json(json!({ "count": tasks.len(), "tasks": tasks })))
}

/// Per-project status counts (a `status` query parameter is accepted and ignored)
pub async fn task_summary(State(state): State<AppState>) -> ApiResult<Json<TaskSummary>> {
    Ok(Json(state.queries.task_summary().await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    patch: Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(patch) = patch?;
    let task = state.queries.update_task(id, patch).await?;
    Ok(Json(json!({ "success": true, "task": task })))
}

pub async fn create_task(
    State(state): State<AppState>,
    request: Result<Json<CreateTask>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = request?;
    let task = state.queries.create_task(request).await?;
    Ok(Json(json!({ "success": true, "task": task })))
}

// ============================================================================
// Projects
// ============================================================================

pub async fn project_keywords(State(state): State<AppState>) -> Json<Value> {
    let keywords = state.queries.keyword_rules().await;
    Json(json!({ "count": keywords.len(), "keywords": keywords }))
}
