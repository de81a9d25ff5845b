//! Webhook ingestion pipeline.
//!
//! Each delivery runs in two phases: [`IngestionOrchestrator::accept`]
//! hands back an acknowledgment immediately and schedules
//! [`IngestionOrchestrator::process`] in the background. The background
//! outcome is only logged; nothing is reported back to the platform.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::adapters::{MediaTranscriber, TranscriptionError};
use crate::domain::{InboundMessage, NewMessage};
use crate::store::Store;

use super::classifier::classify;
use super::keyword_cache::KeywordCache;
use super::task_deriver::derive_task;

/// How one delivery ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The update carried no usable message
    Skipped { reason: String },

    /// The message could not be stored; nothing else was attempted
    NotPersisted { error: String },

    /// The message was stored, with a derived task if one was warranted
    Stored {
        message_id: i64,
        project_id: String,
        task_id: Option<i64>,
    },
}

/// Acknowledgment returned before processing completes
#[derive(Debug)]
pub struct Accepted {
    pub delivery_id: Uuid,
    handle: JoinHandle<IngestOutcome>,
}

impl Accepted {
    /// Wait for the background run (tests, CLI)
    pub async fn outcome(self) -> Result<IngestOutcome, JoinError> {
        self.handle.await
    }
}

/// Drives transcription, classification and task derivation for updates
pub struct IngestionOrchestrator {
    store: Arc<dyn Store>,
    keywords: Arc<KeywordCache>,
    transcriber: Option<Arc<dyn MediaTranscriber>>,
}

impl IngestionOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        keywords: Arc<KeywordCache>,
        transcriber: Option<Arc<dyn MediaTranscriber>>,
    ) -> Self {
        Self {
            store,
            keywords,
            transcriber,
        }
    }

    /// Whether voice/audio attachments will be transcribed
    pub fn transcription_enabled(&self) -> bool {
        self.transcriber.is_some()
    }

    /// Acknowledge an update and process it in the background
    pub fn accept(self: &Arc<Self>, update: Value) -> Accepted {
        let delivery_id = Uuid::new_v4();
        let this = Arc::clone(self);
        let span = info_span!("delivery", %delivery_id);

        let handle = tokio::spawn(async move { this.process(update).await }.instrument(span));
        Accepted {
            delivery_id,
            handle,
        }
    }

    /// Run one update through the pipeline.
    ///
    /// Every failure is logged and turned into an outcome; this never errors.
    #[instrument(skip_all)]
    pub async fn process(&self, update: Value) -> IngestOutcome {
        let inbound = match InboundMessage::from_update(&update) {
            Ok(inbound) => inbound,
            Err(e) => {
                debug!(error = %e, "Skipping update");
                return IngestOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let kind = inbound.kind();
        info!(telegram_id = inbound.telegram_id, %kind, "Received message");

        let mut text = inbound.text.clone();
        let mut transcription = None;

        if let Some(transcriber) = self.transcriber.as_ref().filter(|_| kind.is_transcribable()) {
            let result = match inbound.audio_file_id() {
                Some(file_id) => transcriber.transcribe(file_id).await,
                None => Err(TranscriptionError::MissingFileId),
            };
            match result {
                Ok(transcript) => {
                    info!(
                        transcriber = transcriber.name(),
                        chars = transcript.chars().count(),
                        "Transcribed attachment"
                    );
                    if text.is_none() {
                        text = Some(transcript.clone());
                    }
                    transcription = Some(transcript);
                }
                Err(e) => {
                    warn!(error = %e, "Transcription failed");
                    transcription = Some(format!("[transcription failed: {}]", e));
                }
            }
        }

        let rules = self.keywords.get_rules().await;
        let project_id = classify(text.as_deref(), &rules);
        debug!(%project_id, rules = rules.len(), "Classified message");

        let record = NewMessage {
            telegram_id: inbound.telegram_id,
            chat_id: inbound.chat_id,
            user_id: inbound.user_id,
            username: inbound.username,
            first_name: inbound.first_name,
            text,
            transcription,
            message_type: kind,
            raw_data: update,
            timestamp: inbound.sent_at,
            project_id,
        };

        let message = match self.store.insert_message(record).await {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Failed to store message");
                return IngestOutcome::NotPersisted {
                    error: e.to_string(),
                };
            }
        };
        info!(
            message_id = message.id,
            project_id = %message.project_id,
            "Stored message"
        );

        let task_id = match derive_task(&message) {
            Some(candidate) => match self.store.insert_task(candidate).await {
                Ok(task) => {
                    info!(task_id = task.id, priority = task.priority, title = %task.title, "Created task");
                    Some(task.id)
                }
                Err(e) => {
                    error!(error = %e, message_id = message.id, "Failed to store derived task");
                    None
                }
            },
            None => None,
        };

        IngestOutcome::Stored {
            message_id: message.id,
            project_id: message.project_id,
            task_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::SystemClock;
    use crate::store::SqliteStore;
    use serde_json::json;

    fn orchestrator(store: Arc<SqliteStore>) -> Arc<IngestionOrchestrator> {
        let keywords = Arc::new(KeywordCache::new(store.clone(), Arc::new(SystemClock)));
        Arc::new(IngestionOrchestrator::new(store, keywords, None))
    }

    #[tokio::test]
    async fn test_update_without_message_is_skipped() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orchestrator = orchestrator(store.clone());

        let outcome = orchestrator.process(json!({ "update_id": 1 })).await;
        assert!(matches!(outcome, IngestOutcome::Skipped { .. }));
        assert!(store.latest_messages(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_returns_before_completion() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orchestrator = orchestrator(store.clone());

        let accepted = orchestrator.accept(json!({
            "update_id": 2,
            "message": {
                "message_id": 5,
                "chat": { "id": 1 },
                "from": { "id": 2 },
                "date": 1_700_000_000,
                "text": "hi"
            }
        }));

        match accepted.outcome().await.unwrap() {
            IngestOutcome::Stored {
                project_id,
                task_id,
                ..
            } => {
                assert_eq!(project_id, "uncategorized");
                assert_eq!(task_id, None);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
