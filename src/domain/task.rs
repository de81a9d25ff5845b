//! Tasks derived from messages or created by hand.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Highest task priority (urgent)
pub const MAX_PRIORITY: u8 = 2;

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(UnknownVariant::new("task status", other)),
        }
    }
}

/// Where a task came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// Derived automatically from an inbound Telegram message
    Telegram,

    /// Created through `POST /tasks`
    Manual,
}

impl TaskSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "telegram" => Ok(Self::Telegram),
            "manual" => Ok(Self::Manual),
            other => Err(UnknownVariant::new("task source", other)),
        }
    }
}

/// A task ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub project_id: String,
    pub source: TaskSource,

    /// Originating message (telegram-derived tasks only)
    pub source_msg_id: Option<i64>,
    pub title: String,
    pub body: Option<String>,
    pub status: TaskStatus,
    pub priority: u8,
}

/// A persisted task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: String,
    pub source: TaskSource,
    pub source_msg_id: Option<i64>,
    pub title: String,
    pub body: Option<String>,
    pub status: TaskStatus,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields a caller may change on an existing task
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub priority: Option<u8>,
    pub project_id: Option<String>,
    pub title: Option<String>,
}

impl TaskPatch {
    /// Drop blank strings so they don't overwrite stored values
    pub fn normalized(mut self) -> Self {
        self.project_id = self.project_id.filter(|p| !p.trim().is_empty());
        self.title = self.title.filter(|t| !t.trim().is_empty());
        self
    }
}

/// A patch stamped with the times the store should record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    pub patch: TaskPatch,
    pub updated_at: DateTime<Utc>,

    /// Set only when the patch moves the task to `done`
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskUpdate {
    pub fn new(patch: TaskPatch, now: DateTime<Utc>) -> Self {
        let completed_at = (patch.status == Some(TaskStatus::Done)).then_some(now);
        Self {
            patch,
            updated_at: now,
            completed_at,
        }
    }
}

/// Filter for task listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskFilter {
    pub project_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub limit: Option<usize>,
}

/// Task counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusCounts {
    fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Done => self.done += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.done
    }
}

/// Dashboard badge counts: overall and per project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub total: StatusCounts,
    pub projects: BTreeMap<String, StatusCounts>,
}

impl TaskSummary {
    /// Tally `(project_id, status)` pairs
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, TaskStatus)>,
    {
        let mut summary = Self::default();
        for (project_id, status) in rows {
            summary.total.record(status);
            summary.projects.entry(project_id).or_default().record(status);
        }
        summary
    }
}
