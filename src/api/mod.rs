//! HTTP surface.
//!
//! One router serves the Telegram webhook and the dashboard's read/update
//! endpoints. Handlers stay thin; the work lives in [`crate::core`].

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::{IngestionOrchestrator, QueryService};

pub use error::{ApiError, ApiResult};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<IngestionOrchestrator>,
    pub queries: Arc<QueryService>,
}

impl AppState {
    pub fn new(orchestrator: Arc<IngestionOrchestrator>, queries: Arc<QueryService>) -> Self {
        Self {
            orchestrator,
            queries,
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        // Ingestion
        .route("/webhook/telegram", post(handlers::telegram_webhook))
        // Messages
        .route("/messages/unread", get(handlers::unread_messages))
        .route("/messages/latest", get(handlers::latest_messages))
        .route("/messages/mark-read", post(handlers::mark_read))
        .route("/messages/:id/assign", post(handlers::assign_message))
        // Tasks
        .route("/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route("/tasks/summary", get(handlers::task_summary))
        .route("/tasks/:id", patch(handlers::update_task))
        // Projects
        .route("/projects/keywords", get(handlers::project_keywords))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `0.0.0.0:port` and serve until the process exits
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "Listening");
    axum::serve(listener, build_router(state))
        .await
        .context("HTTP server error")
}
