//! orbit-bridge - Telegram to project inbox bridge
//!
//! Receives Telegram webhook updates, transcribes voice notes, classifies
//! each message into a project by keyword, and derives tasks from the ones
//! that look actionable.
//!
//! # Architecture
//!
//! The webhook acknowledges immediately and processes in the background:
//! - Voice/audio attachments are transcribed (best effort)
//! - Text is classified against a TTL-cached keyword rule set
//! - The message is stored, then a task is derived when warranted
//!
//! # Modules
//!
//! - `adapters`: External system integrations (Telegram, Whisper)
//! - `api`: HTTP routes (axum)
//! - `core`: Classification, task derivation, ingestion and queries
//! - `domain`: Data structures (Message, Task, KeywordRule, updates)
//! - `store`: SQLite persistence
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the service
//! orbit-bridge serve --port 3000
//!
//! # Add a keyword rule
//! orbit-bridge keywords add "Squire:" squire --priority 10
//!
//! # Replay a saved update
//! orbit-bridge ingest update.json
//! ```

pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use crate::api::{build_router, AppState};
pub use crate::core::{IngestOutcome, IngestionOrchestrator, KeywordCache, QueryService};
pub use crate::domain::{KeywordRule, Message, MessageKind, Task, TaskStatus};
pub use crate::store::{SqliteStore, Store, StoreError};
