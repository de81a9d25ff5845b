//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use orbit_bridge::adapters::{MediaTranscriber, TranscriptionError};
use orbit_bridge::core::{Clock, IngestionOrchestrator, KeywordCache, QueryService, SystemClock};
use orbit_bridge::domain::{
    KeywordRule, Message, NewMessage, NewTask, Task, TaskFilter, TaskStatus, TaskUpdate,
};
use orbit_bridge::store::{SqliteStore, Store, StoreError};

/// In-memory store with switchable failures and a call counter
pub struct FaultyStore {
    pub inner: SqliteStore,
    pub fail_insert_message: AtomicBool,
    pub fail_insert_task: AtomicBool,
    pub fail_task_reassign: AtomicBool,
    pub fail_reads: AtomicBool,
    pub calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            fail_insert_message: AtomicBool::new(false),
            fail_insert_task: AtomicBool::new(false),
            fail_task_reassign: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!("{} unavailable", what)))
        } else {
            Ok(())
        }
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.enter(&self.fail_insert_message, "messages")?;
        self.inner.insert_message(message).await
    }

    async fn unread_messages(&self) -> Result<Vec<Message>, StoreError> {
        self.enter(&self.fail_reads, "messages")?;
        self.inner.unread_messages().await
    }

    async fn latest_messages(&self, limit: usize) -> Result<Vec<Message>, StoreError> {
        self.enter(&self.fail_reads, "messages")?;
        self.inner.latest_messages(limit).await
    }

    async fn mark_read(&self, ids: &[i64]) -> Result<usize, StoreError> {
        self.count();
        self.inner.mark_read(ids).await
    }

    async fn set_message_project(&self, id: i64, project_id: &str) -> Result<usize, StoreError> {
        self.count();
        self.inner.set_message_project(id, project_id).await
    }

    async fn set_task_project_for_message(
        &self,
        message_id: i64,
        project_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.enter(&self.fail_task_reassign, "tasks")?;
        self.inner
            .set_task_project_for_message(message_id, project_id, updated_at)
            .await
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.enter(&self.fail_insert_task, "tasks")?;
        self.inner.insert_task(task).await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.enter(&self.fail_reads, "tasks")?;
        self.inner.list_tasks(filter).await
    }

    async fn task_statuses(&self) -> Result<Vec<(String, TaskStatus)>, StoreError> {
        self.enter(&self.fail_reads, "tasks")?;
        self.inner.task_statuses().await
    }

    async fn update_task(&self, id: i64, update: TaskUpdate) -> Result<Option<Task>, StoreError> {
        self.count();
        self.inner.update_task(id, update).await
    }

    async fn keyword_rules(&self) -> Result<Vec<KeywordRule>, StoreError> {
        self.count();
        self.inner.keyword_rules().await
    }

    async fn insert_keyword_rule(&self, rule: KeywordRule) -> Result<(), StoreError> {
        self.count();
        self.inner.insert_keyword_rule(rule).await
    }
}

/// Transcriber returning a canned result
pub struct FakeTranscriber {
    pub result: Result<String, String>,
    pub calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn ok(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaTranscriber for FakeTranscriber {
    fn name(&self) -> &str {
        "fake"
    }

    async fn transcribe(&self, _file_id: &str) -> Result<String, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(text) => Ok(text.clone()),
            Err(reason) => Err(TranscriptionError::Platform(reason.clone())),
        }
    }
}

/// Everything a pipeline test needs, sharing one store
pub struct Harness {
    pub store: Arc<FaultyStore>,
    pub orchestrator: Arc<IngestionOrchestrator>,
    pub queries: Arc<QueryService>,
}

impl Harness {
    pub async fn new(rules: Vec<KeywordRule>) -> Self {
        Self::with_transcriber(rules, None).await
    }

    pub async fn with_transcriber(
        rules: Vec<KeywordRule>,
        transcriber: Option<Arc<dyn MediaTranscriber>>,
    ) -> Self {
        let store = Arc::new(FaultyStore::new());
        for rule in rules {
            store.inner.insert_keyword_rule(rule).await.unwrap();
        }

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let source = Arc::new(store.inner.clone());
        let keywords = Arc::new(KeywordCache::new(source, clock.clone()));
        let orchestrator = Arc::new(IngestionOrchestrator::new(
            store.clone(),
            keywords.clone(),
            transcriber,
        ));
        let queries = Arc::new(QueryService::new(store.clone(), keywords, clock));

        Self {
            store,
            orchestrator,
            queries,
        }
    }
}

/// A text message update
pub fn text_update(message_id: i64, text: &str) -> Value {
    json!({
        "update_id": 1000 + message_id,
        "message": {
            "message_id": message_id,
            "chat": { "id": 555 },
            "from": { "id": 42, "username": "alex", "first_name": "Alex" },
            "date": 1_700_000_000 + message_id,
            "text": text
        }
    })
}

/// A voice note update, optionally captioned
pub fn voice_update(message_id: i64, caption: Option<&str>) -> Value {
    let mut update = json!({
        "update_id": 2000 + message_id,
        "message": {
            "message_id": message_id,
            "chat": { "id": 555 },
            "from": { "id": 42 },
            "date": 1_700_000_000 + message_id,
            "voice": { "file_id": format!("voice-{}", message_id), "duration": 4 }
        }
    });
    if let Some(caption) = caption {
        update["message"]["caption"] = json!(caption);
    }
    update
}
