//! Domain types for the bridge.
//!
//! This module contains the core data structures:
//! - Update: typed view of an inbound Telegram webhook update
//! - Message: stored messages and their kinds
//! - Task: derived/manual tasks, patches, filters and summaries
//! - Rule: keyword-to-project classification rules

pub mod message;
pub mod rule;
pub mod task;
pub mod update;

use thiserror::Error;

// Re-export commonly used types
pub use message::{Message, MessageKind, NewMessage, UNCATEGORIZED};
pub use rule::KeywordRule;
pub use task::{
    NewTask, StatusCounts, Task, TaskFilter, TaskPatch, TaskSource, TaskStatus, TaskSummary,
    TaskUpdate, MAX_PRIORITY,
};
pub use update::{Attachment, InboundMessage, IngestionError};

/// A stored enum value that doesn't name a known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
