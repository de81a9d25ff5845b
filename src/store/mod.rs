//! Persistence for messages, tasks and keyword rules.
//!
//! The pipeline talks to the [`Store`] trait; [`SqliteStore`] is the
//! production backend.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    KeywordRule, Message, NewMessage, NewTask, Task, TaskFilter, TaskStatus, TaskUpdate,
};

pub use sqlite::SqliteStore;

/// Errors from a store operation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store worker failed: {0}")]
    Worker(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Message/task/rule persistence
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a message and return the stored row
    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Unread messages, oldest first
    async fn unread_messages(&self) -> Result<Vec<Message>, StoreError>;

    /// Most recent `limit` messages, newest first
    async fn latest_messages(&self, limit: usize) -> Result<Vec<Message>, StoreError>;

    /// Set `read` on the given ids, returning how many rows changed
    async fn mark_read(&self, ids: &[i64]) -> Result<usize, StoreError>;

    /// Move one message to another project
    async fn set_message_project(&self, id: i64, project_id: &str) -> Result<usize, StoreError>;

    /// Move every task derived from `message_id` to another project
    async fn set_task_project_for_message(
        &self,
        message_id: i64,
        project_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Insert a task and return the stored row
    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Tasks by priority (high first), then age (old first)
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    /// `(project_id, status)` of every task
    async fn task_statuses(&self) -> Result<Vec<(String, TaskStatus)>, StoreError>;

    /// Apply an update; `None` if no task has that id
    async fn update_task(&self, id: i64, update: TaskUpdate) -> Result<Option<Task>, StoreError>;

    /// All keyword rules, highest priority first
    async fn keyword_rules(&self) -> Result<Vec<KeywordRule>, StoreError>;

    /// Add a keyword rule
    async fn insert_keyword_rule(&self, rule: KeywordRule) -> Result<(), StoreError>;
}
