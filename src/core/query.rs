//! Read/update surface for messages, tasks and rules.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{
    KeywordRule, Message, NewTask, Task, TaskFilter, TaskPatch, TaskSource, TaskStatus,
    TaskSummary, TaskUpdate, MAX_PRIORITY,
};
use crate::store::{Store, StoreError};

use super::clock::Clock;
use super::keyword_cache::KeywordCache;

/// Default page size for latest messages
pub const DEFAULT_LATEST_LIMIT: usize = 10;

/// Errors surfaced to query callers
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Body of a manual task creation request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTask {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
}

/// Query operations over the store
pub struct QueryService {
    store: Arc<dyn Store>,
    keywords: Arc<KeywordCache>,
    clock: Arc<dyn Clock>,
}

fn check_priority(priority: Option<u8>) -> Result<(), QueryError> {
    match priority {
        Some(p) if p > MAX_PRIORITY => Err(QueryError::Validation(format!(
            "priority must be between 0 and {}",
            MAX_PRIORITY
        ))),
        _ => Ok(()),
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, QueryError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| QueryError::Validation(format!("{} is required", field)))
}

impl QueryService {
    pub fn new(store: Arc<dyn Store>, keywords: Arc<KeywordCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            keywords,
            clock,
        }
    }

    /// Unread messages, oldest first
    pub async fn unread_messages(&self) -> Result<Vec<Message>, QueryError> {
        Ok(self.store.unread_messages().await?)
    }

    /// Latest messages, newest first (10 when `limit` is absent or zero)
    pub async fn latest_messages(&self, limit: Option<usize>) -> Result<Vec<Message>, QueryError> {
        let limit = limit.filter(|&n| n > 0).unwrap_or(DEFAULT_LATEST_LIMIT);
        Ok(self.store.latest_messages(limit).await?)
    }

    pub async fn mark_read(&self, ids: &[i64]) -> Result<usize, QueryError> {
        Ok(self.store.mark_read(ids).await?)
    }

    /// Move a message to another project and carry its task(s) along.
    ///
    /// Only the message update can fail the call.
    pub async fn assign_message(&self, id: i64, project_id: &str) -> Result<(), QueryError> {
        let project_id = required(Some(project_id.to_string()), "project_id")?;
        self.store.set_message_project(id, &project_id).await?;

        match self
            .store
            .set_task_project_for_message(id, &project_id, self.clock.now())
            .await
        {
            Ok(moved) => info!(message_id = id, %project_id, tasks = moved, "Reassigned message"),
            Err(e) => warn!(
                message_id = id,
                %project_id,
                error = %e,
                "Reassigned message but failed to move its task"
            ),
        }
        Ok(())
    }

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, QueryError> {
        Ok(self.store.list_tasks(filter).await?)
    }

    pub async fn task_summary(&self) -> Result<TaskSummary, QueryError> {
        let rows = self.store.task_statuses().await?;
        Ok(TaskSummary::from_rows(rows))
    }

    /// Apply a patch; `updated_at` is always bumped
    pub async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Task, QueryError> {
        check_priority(patch.priority)?;
        let update = TaskUpdate::new(patch.normalized(), self.clock.now());

        self.store
            .update_task(id, update)
            .await?
            .ok_or(QueryError::NotFound(id))
    }

    /// Create a manual task; nothing touches the store unless the request is valid
    pub async fn create_task(&self, request: CreateTask) -> Result<Task, QueryError> {
        let project_id = required(request.project_id, "project_id")?;
        let title = required(request.title, "title")?;
        check_priority(request.priority)?;

        let task = self
            .store
            .insert_task(NewTask {
                project_id,
                source: TaskSource::Manual,
                source_msg_id: None,
                title,
                body: request.body,
                status: TaskStatus::Pending,
                priority: request.priority.unwrap_or(0),
            })
            .await?;

        info!(task_id = task.id, project_id = %task.project_id, "Created manual task");
        Ok(task)
    }

    /// Currently cached rule set
    pub async fn keyword_rules(&self) -> Vec<KeywordRule> {
        self.keywords.get_rules().await
    }
}
