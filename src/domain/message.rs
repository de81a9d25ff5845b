//! Stored Telegram messages.
//!
//! A message row is immutable after insert except for its `read` flag and
//! its `project_id`, which the reassignment endpoint may change.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Project assigned when no keyword rule matches
pub const UNCATEGORIZED: &str = "uncategorized";

/// Kind of content carried by an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Voice,
    Audio,
    Photo,
    Document,
}

impl MessageKind {
    /// Storage / wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Audio => "audio",
            Self::Photo => "photo",
            Self::Document => "document",
        }
    }

    /// Voice notes and audio files are candidates for transcription
    pub fn is_transcribable(self) -> bool {
        matches!(self, Self::Voice | Self::Audio)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            "audio" => Ok(Self::Audio),
            "photo" => Ok(Self::Photo),
            "document" => Ok(Self::Document),
            other => Err(UnknownVariant::new("message kind", other)),
        }
    }
}

/// A message ready to be inserted (no store id yet)
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    /// Telegram `message_id`
    pub telegram_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,

    /// Text or caption, backfilled with the transcript for voice/audio
    pub text: Option<String>,

    /// Transcript, or a `[transcription failed: ...]` placeholder
    pub transcription: Option<String>,

    pub message_type: MessageKind,

    /// The full webhook update, kept verbatim for audit
    pub raw_data: serde_json::Value,

    /// When the message was sent (Telegram `date`)
    pub timestamp: DateTime<Utc>,

    pub project_id: String,
}

/// A persisted message row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned identifier
    pub id: i64,
    pub telegram_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub text: Option<String>,
    pub transcription: Option<String>,
    pub message_type: MessageKind,
    pub raw_data: serde_json::Value,
    pub read: bool,
    pub timestamp: DateTime<Utc>,

    /// When the row was ingested
    pub created_at: DateTime<Utc>,
    pub project_id: String,
}
