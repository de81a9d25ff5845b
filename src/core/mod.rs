//! Core ingestion logic.
//!
//! This module contains:
//! - Classifier: keyword-based project classification
//! - KeywordCache: TTL cache of classification rules
//! - TaskDeriver: message → task heuristics
//! - Orchestrator: webhook ingestion pipeline
//! - Query: read/update operations for the HTTP surface

pub mod classifier;
pub mod clock;
pub mod keyword_cache;
pub mod orchestrator;
pub mod query;
pub mod task_deriver;

// Re-export commonly used types
pub use classifier::classify;
pub use clock::{Clock, ManualClock, SystemClock};
pub use keyword_cache::{KeywordCache, RuleSource, DEFAULT_TTL_SECONDS};
pub use orchestrator::{Accepted, IngestOutcome, IngestionOrchestrator};
pub use query::{CreateTask, QueryError, QueryService, DEFAULT_LATEST_LIMIT};
pub use task_deriver::{derive_task, generate_title, is_trivial, priority_for};
