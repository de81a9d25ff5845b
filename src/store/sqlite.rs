//! SQLite-backed store.
//!
//! One connection behind a mutex; every call runs on the blocking pool so
//! the async runtime never waits on disk I/O.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::core::keyword_cache::RuleSource;
use crate::domain::{
    KeywordRule, Message, NewMessage, NewTask, Task, TaskFilter, TaskStatus, TaskUpdate,
    UnknownVariant,
};

use super::{Store, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS telegram_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    telegram_id INTEGER NOT NULL,
    chat_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    username TEXT,
    first_name TEXT,
    text TEXT,
    transcription TEXT,
    message_type TEXT NOT NULL DEFAULT 'text',
    raw_data TEXT,
    read INTEGER NOT NULL DEFAULT 0,
    timestamp TEXT NOT NULL,
    created_at TEXT NOT NULL,
    project_id TEXT NOT NULL DEFAULT 'uncategorized'
);
CREATE INDEX IF NOT EXISTS idx_telegram_messages_read ON telegram_messages(read);
CREATE INDEX IF NOT EXISTS idx_telegram_messages_timestamp ON telegram_messages(timestamp DESC);

CREATE TABLE IF NOT EXISTS orbit_tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    source TEXT NOT NULL,
    source_msg_id INTEGER,
    title TEXT NOT NULL,
    body TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    priority INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_orbit_tasks_source_msg ON orbit_tasks(source_msg_id);
CREATE INDEX IF NOT EXISTS idx_orbit_tasks_project_status ON orbit_tasks(project_id, status);

CREATE TABLE IF NOT EXISTS orbit_project_keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL,
    project_id TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0
);
"#;

const MESSAGE_COLUMNS: &str = "id, telegram_id, chat_id, user_id, username, first_name, text, \
     transcription, message_type, raw_data, read, timestamp, created_at, project_id";

const TASK_COLUMNS: &str = "id, project_id, source, source_msg_id, title, body, status, \
     priority, created_at, updated_at, completed_at";

/// SQLite implementation of [`Store`]
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Worker("connection mutex poisoned".to_string()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

/// Parse a TEXT column into one of the domain enums
fn parse_column<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let idx = row.as_ref().column_index(column)?;
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get("id")?,
        telegram_id: row.get("telegram_id")?,
        chat_id: row.get("chat_id")?,
        user_id: row.get("user_id")?,
        username: row.get("username")?,
        first_name: row.get("first_name")?,
        text: row.get("text")?,
        transcription: row.get("transcription")?,
        message_type: parse_column(row, "message_type")?,
        raw_data: row
            .get::<_, Option<serde_json::Value>>("raw_data")?
            .unwrap_or(serde_json::Value::Null),
        read: row.get("read")?,
        timestamp: row.get("timestamp")?,
        created_at: row.get("created_at")?,
        project_id: row.get("project_id")?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        source: parse_column(row, "source")?,
        source_msg_id: row.get("source_msg_id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        status: parse_column(row, "status")?,
        priority: row.get("priority")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        completed_at: row.get("completed_at")?,
    })
}

fn select_task(conn: &Connection, id: i64) -> Result<Option<Task>, StoreError> {
    let sql = format!("SELECT {} FROM orbit_tasks WHERE id = ?1", TASK_COLUMNS);
    Ok(conn.query_row(&sql, params![id], task_from_row).optional()?)
}

fn query_messages(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Message>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, message_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.call(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO telegram_messages (telegram_id, chat_id, user_id, username, \
                 first_name, text, transcription, message_type, raw_data, read, timestamp, \
                 created_at, project_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11, ?12)",
                params![
                    message.telegram_id,
                    message.chat_id,
                    message.user_id,
                    message.username,
                    message.first_name,
                    message.text,
                    message.transcription,
                    message.message_type.as_str(),
                    message.raw_data,
                    message.timestamp,
                    created_at,
                    message.project_id,
                ],
            )?;

            Ok(Message {
                id: conn.last_insert_rowid(),
                telegram_id: message.telegram_id,
                chat_id: message.chat_id,
                user_id: message.user_id,
                username: message.username,
                first_name: message.first_name,
                text: message.text,
                transcription: message.transcription,
                message_type: message.message_type,
                raw_data: message.raw_data,
                read: false,
                timestamp: message.timestamp,
                created_at,
                project_id: message.project_id,
            })
        })
        .await
    }

    async fn unread_messages(&self) -> Result<Vec<Message>, StoreError> {
        self.call(|conn| {
            let sql = format!(
                "SELECT {} FROM telegram_messages WHERE read = 0 ORDER BY timestamp ASC, id ASC",
                MESSAGE_COLUMNS
            );
            query_messages(conn, &sql, [])
        })
        .await
    }

    async fn latest_messages(&self, limit: usize) -> Result<Vec<Message>, StoreError> {
        self.call(move |conn| {
            let sql = format!(
                "SELECT {} FROM telegram_messages ORDER BY timestamp DESC, id DESC LIMIT ?1",
                MESSAGE_COLUMNS
            );
            query_messages(conn, &sql, params![to_sql_limit(limit)])
        })
        .await
    }

    async fn mark_read(&self, ids: &[i64]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let ids = ids.to_vec();
        self.call(move |conn| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let sql = format!(
                "UPDATE telegram_messages SET read = 1 WHERE id IN ({})",
                placeholders
            );
            Ok(conn.execute(&sql, params_from_iter(ids.iter()))?)
        })
        .await
    }

    async fn set_message_project(&self, id: i64, project_id: &str) -> Result<usize, StoreError> {
        let project_id = project_id.to_string();
        self.call(move |conn| {
            Ok(conn.execute(
                "UPDATE telegram_messages SET project_id = ?1 WHERE id = ?2",
                params![project_id, id],
            )?)
        })
        .await
    }

    async fn set_task_project_for_message(
        &self,
        message_id: i64,
        project_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let project_id = project_id.to_string();
        self.call(move |conn| {
            Ok(conn.execute(
                "UPDATE orbit_tasks SET project_id = ?1, updated_at = ?2 WHERE source_msg_id = ?3",
                params![project_id, updated_at, message_id],
            )?)
        })
        .await
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.call(move |conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO orbit_tasks (project_id, source, source_msg_id, title, body, \
                 status, priority, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    task.project_id,
                    task.source.as_str(),
                    task.source_msg_id,
                    task.title,
                    task.body,
                    task.status.as_str(),
                    task.priority,
                    now,
                ],
            )?;

            Ok(Task {
                id: conn.last_insert_rowid(),
                project_id: task.project_id,
                source: task.source,
                source_msg_id: task.source_msg_id,
                title: task.title,
                body: task.body,
                status: task.status,
                priority: task.priority,
                created_at: now,
                updated_at: now,
                completed_at: None,
            })
        })
        .await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let filter = filter.clone();
        self.call(move |conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(project_id) = filter.project_id {
                clauses.push("project_id = ?");
                values.push(Box::new(project_id));
            }
            if let Some(status) = filter.status {
                clauses.push("status = ?");
                values.push(Box::new(status.as_str().to_string()));
            }

            let mut sql = format!("SELECT {} FROM orbit_tasks", TASK_COLUMNS);
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY priority DESC, created_at ASC, id ASC");
            if let Some(limit) = filter.limit {
                sql.push_str(" LIMIT ?");
                values.push(Box::new(to_sql_limit(limit)));
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), task_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn task_statuses(&self) -> Result<Vec<(String, TaskStatus)>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn.prepare("SELECT project_id, status FROM orbit_tasks")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>("project_id")?,
                    parse_column::<TaskStatus>(row, "status")?,
                ))
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn update_task(&self, id: i64, update: TaskUpdate) -> Result<Option<Task>, StoreError> {
        self.call(move |conn| {
            let TaskUpdate {
                patch,
                updated_at,
                completed_at,
            } = update;

            let mut sets: Vec<&str> = vec!["updated_at = ?"];
            let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(updated_at)];

            if let Some(status) = patch.status {
                sets.push("status = ?");
                values.push(Box::new(status.as_str().to_string()));
            }
            if let Some(priority) = patch.priority {
                sets.push("priority = ?");
                values.push(Box::new(priority));
            }
            if let Some(project_id) = patch.project_id {
                sets.push("project_id = ?");
                values.push(Box::new(project_id));
            }
            if let Some(title) = patch.title {
                sets.push("title = ?");
                values.push(Box::new(title));
            }
            if let Some(completed_at) = completed_at {
                sets.push("completed_at = ?");
                values.push(Box::new(completed_at));
            }
            values.push(Box::new(id));

            let sql = format!("UPDATE orbit_tasks SET {} WHERE id = ?", sets.join(", "));
            if conn.execute(&sql, params_from_iter(values.iter()))? == 0 {
                return Ok(None);
            }
            select_task(conn, id)
        })
        .await
    }

    async fn keyword_rules(&self) -> Result<Vec<KeywordRule>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT keyword, project_id, priority FROM orbit_project_keywords \
                 ORDER BY priority DESC, id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(KeywordRule {
                    keyword: row.get("keyword")?,
                    project_id: row.get("project_id")?,
                    priority: row.get("priority")?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn insert_keyword_rule(&self, rule: KeywordRule) -> Result<(), StoreError> {
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO orbit_project_keywords (keyword, project_id, priority) \
                 VALUES (?1, ?2, ?3)",
                params![rule.keyword, rule.project_id, rule.priority],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RuleSource for SqliteStore {
    async fn fetch_rules(&self) -> AnyResult<Vec<KeywordRule>> {
        Ok(self.keyword_rules().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageKind, TaskPatch, TaskSource};
    use chrono::Duration;
    use tempfile::TempDir;

    fn new_message(telegram_id: i64, timestamp: DateTime<Utc>) -> NewMessage {
        NewMessage {
            telegram_id,
            chat_id: 10,
            user_id: 20,
            username: Some("ada".to_string()),
            first_name: None,
            text: Some(format!("message {}", telegram_id)),
            transcription: None,
            message_type: MessageKind::Text,
            raw_data: serde_json::json!({ "update_id": telegram_id }),
            timestamp,
            project_id: "uncategorized".to_string(),
        }
    }

    fn new_task(project_id: &str, priority: u8, source_msg_id: Option<i64>) -> NewTask {
        NewTask {
            project_id: project_id.to_string(),
            source: if source_msg_id.is_some() {
                TaskSource::Telegram
            } else {
                TaskSource::Manual
            },
            source_msg_id,
            title: format!("task for {}", project_id),
            body: None,
            status: TaskStatus::Pending,
            priority,
        }
    }

    #[tokio::test]
    async fn test_message_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stored = store.insert_message(new_message(1, Utc::now())).await.unwrap();

        let latest = store.latest_messages(10).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0], stored);
        assert_eq!(latest[0].raw_data["update_id"], 1);
        assert!(!latest[0].read);
    }

    #[tokio::test]
    async fn test_unread_oldest_first_and_mark_read() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let newer = store.insert_message(new_message(1, now)).await.unwrap();
        let older = store
            .insert_message(new_message(2, now - Duration::minutes(5)))
            .await
            .unwrap();

        let unread = store.unread_messages().await.unwrap();
        assert_eq!(unread.iter().map(|m| m.id).collect::<Vec<_>>(), vec![older.id, newer.id]);

        assert_eq!(store.mark_read(&[older.id]).await.unwrap(), 1);
        let unread = store.unread_messages().await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, newer.id);

        assert_eq!(store.mark_read(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_latest_newest_first_with_limit() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        for i in 0..5 {
            store
                .insert_message(new_message(i, now + Duration::seconds(i)))
                .await
                .unwrap();
        }

        let latest = store.latest_messages(2).await.unwrap();
        assert_eq!(
            latest.iter().map(|m| m.telegram_id).collect::<Vec<_>>(),
            vec![4, 3]
        );
    }

    #[tokio::test]
    async fn test_task_ordering_and_filters() {
        let store = SqliteStore::open_in_memory().unwrap();
        let low = store.insert_task(new_task("alpha", 0, None)).await.unwrap();
        let high = store.insert_task(new_task("alpha", 2, None)).await.unwrap();
        let other = store.insert_task(new_task("beta", 1, None)).await.unwrap();

        let all = store.list_tasks(&TaskFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![high.id, other.id, low.id]
        );

        let alpha = store
            .list_tasks(&TaskFilter {
                project_id: Some("alpha".to_string()),
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(alpha.len(), 1);
        assert_eq!(alpha[0].id, high.id);
    }

    #[tokio::test]
    async fn test_update_task_to_done() {
        let store = SqliteStore::open_in_memory().unwrap();
        let task = store.insert_task(new_task("alpha", 0, None)).await.unwrap();

        let now = Utc::now();
        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            title: Some("renamed".to_string()),
            ..Default::default()
        };
        let updated = store
            .update_task(task.id, TaskUpdate::new(patch, now))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.completed_at, Some(now));
        assert_eq!(updated.updated_at, now);
        assert_eq!(updated.project_id, "alpha");
    }

    #[tokio::test]
    async fn test_update_unknown_task_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store
            .update_task(99, TaskUpdate::new(TaskPatch::default(), Utc::now()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_reassign_tasks_for_message() {
        let store = SqliteStore::open_in_memory().unwrap();
        let message = store.insert_message(new_message(1, Utc::now())).await.unwrap();
        store
            .insert_task(new_task("alpha", 1, Some(message.id)))
            .await
            .unwrap();
        store.insert_task(new_task("alpha", 1, None)).await.unwrap();

        assert_eq!(store.set_message_project(message.id, "beta").await.unwrap(), 1);
        let moved = store
            .set_task_project_for_message(message.id, "beta", Utc::now())
            .await
            .unwrap();
        assert_eq!(moved, 1);

        let summary = store.task_statuses().await.unwrap();
        assert!(summary.contains(&("beta".to_string(), TaskStatus::Pending)));
        assert!(summary.contains(&("alpha".to_string(), TaskStatus::Pending)));
    }

    #[tokio::test]
    async fn test_keyword_rules_by_priority() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_keyword_rule(KeywordRule::new("bug", "bugs", 1))
            .await
            .unwrap();
        store
            .insert_keyword_rule(KeywordRule::new("Squire:", "squire", 5))
            .await
            .unwrap();

        let rules = store.fetch_rules().await.unwrap();
        assert_eq!(rules[0].keyword, "Squire:");
        assert_eq!(rules[1].keyword, "bug");
    }

    #[tokio::test]
    async fn test_open_creates_database_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("orbit.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert_keyword_rule(KeywordRule::new("bug", "bugs", 0))
                .await
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.keyword_rules().await.unwrap().len(), 1);
    }
}
