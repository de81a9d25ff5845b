//! Typed view of an inbound Telegram webhook update.
//!
//! Only the fields the pipeline needs are parsed; the full update is kept
//! as raw JSON on the stored message for audit.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::message::MessageKind;

/// Reasons an update is skipped without storing anything
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Update carries neither message nor edited_message")]
    NoMessage,

    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid message date: {0}")]
    InvalidDate(i64),
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    edited_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    message_id: i64,
    chat: RawChat,
    from: RawUser,
    date: i64,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    voice: Option<RawFile>,
    #[serde(default)]
    audio: Option<RawFile>,
    #[serde(default)]
    photo: Option<serde_json::Value>,
    #[serde(default)]
    document: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(default)]
    file_id: Option<String>,
}

/// What the message carries besides text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    None,
    Voice { file_id: Option<String> },
    Audio { file_id: Option<String> },
    Photo,
    Document,
}

/// A parsed `message` / `edited_message`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub telegram_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,

    /// `text`, falling back to `caption`
    pub text: Option<String>,
    pub attachment: Attachment,
    pub sent_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Parse a raw webhook update.
    ///
    /// `message` wins over `edited_message` when both are present.
    pub fn from_update(update: &serde_json::Value) -> Result<Self, IngestionError> {
        let raw = RawUpdate::deserialize(update)?;
        let body = raw
            .message
            .filter(|m| !m.is_null())
            .or(raw.edited_message.filter(|m| !m.is_null()))
            .ok_or(IngestionError::NoMessage)?;

        let message = RawMessage::deserialize(&body)?;
        let sent_at = DateTime::from_timestamp(message.date, 0)
            .ok_or(IngestionError::InvalidDate(message.date))?;

        // Voice is checked before audio, audio before photo, photo before document
        let attachment = if let Some(voice) = message.voice {
            Attachment::Voice {
                file_id: voice.file_id,
            }
        } else if let Some(audio) = message.audio {
            Attachment::Audio {
                file_id: audio.file_id,
            }
        } else if message.photo.is_some_and(|p| !p.is_null()) {
            Attachment::Photo
        } else if message.document.is_some_and(|d| !d.is_null()) {
            Attachment::Document
        } else {
            Attachment::None
        };

        let text = message
            .text
            .filter(|t| !t.is_empty())
            .or(message.caption.filter(|c| !c.is_empty()));

        Ok(Self {
            telegram_id: message.message_id,
            chat_id: message.chat.id,
            user_id: message.from.id,
            username: message.from.username,
            first_name: message.from.first_name,
            text,
            attachment,
            sent_at,
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self.attachment {
            Attachment::None => MessageKind::Text,
            Attachment::Voice { .. } => MessageKind::Voice,
            Attachment::Audio { .. } => MessageKind::Audio,
            Attachment::Photo => MessageKind::Photo,
            Attachment::Document => MessageKind::Document,
        }
    }

    /// Telegram file id of a voice note or audio file, when the platform sent one
    pub fn audio_file_id(&self) -> Option<&str> {
        match &self.attachment {
            Attachment::Voice { file_id } | Attachment::Audio { file_id } => file_id.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_message() -> serde_json::Value {
        json!({
            "message_id": 42,
            "chat": { "id": -100 },
            "from": { "id": 7, "username": "ada", "first_name": "Ada" },
            "date": 1_700_000_000
        })
    }

    #[test]
    fn test_parses_text_message() {
        let mut message = base_message();
        message["text"] = json!("hello world");
        let parsed = InboundMessage::from_update(&json!({ "update_id": 1, "message": message })).unwrap();

        assert_eq!(parsed.telegram_id, 42);
        assert_eq!(parsed.chat_id, -100);
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.username.as_deref(), Some("ada"));
        assert_eq!(parsed.first_name.as_deref(), Some("Ada"));
        assert_eq!(parsed.text.as_deref(), Some("hello world"));
        assert_eq!(parsed.kind(), MessageKind::Text);
        assert_eq!(parsed.sent_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_edited_message_is_used_when_message_absent() {
        let mut message = base_message();
        message["text"] = json!("edited");
        let parsed = InboundMessage::from_update(&json!({ "edited_message": message })).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("edited"));
    }

    #[test]
    fn test_caption_is_fallback_for_text() {
        let mut message = base_message();
        message["caption"] = json!("look at this");
        message["photo"] = json!([{ "file_id": "p1" }]);
        let parsed = InboundMessage::from_update(&json!({ "message": message })).unwrap();

        assert_eq!(parsed.kind(), MessageKind::Photo);
        assert_eq!(parsed.text.as_deref(), Some("look at this"));
    }

    #[test]
    fn test_empty_text_falls_back_to_caption() {
        let mut message = base_message();
        message["text"] = json!("");
        message["caption"] = json!("caption wins");
        let parsed = InboundMessage::from_update(&json!({ "message": message })).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("caption wins"));
    }

    #[test]
    fn test_voice_takes_precedence_over_other_attachments() {
        let mut message = base_message();
        message["voice"] = json!({ "file_id": "v1", "duration": 3 });
        message["document"] = json!({ "file_id": "d1" });
        let parsed = InboundMessage::from_update(&json!({ "message": message })).unwrap();

        assert_eq!(parsed.kind(), MessageKind::Voice);
        assert_eq!(parsed.audio_file_id(), Some("v1"));
        assert!(parsed.text.is_none());
    }

    #[test]
    fn test_audio_and_document_kinds() {
        let mut audio = base_message();
        audio["audio"] = json!({ "file_id": "a1" });
        let parsed = InboundMessage::from_update(&json!({ "message": audio })).unwrap();
        assert_eq!(parsed.kind(), MessageKind::Audio);
        assert_eq!(parsed.audio_file_id(), Some("a1"));

        let mut document = base_message();
        document["document"] = json!({ "file_id": "d1" });
        let parsed = InboundMessage::from_update(&json!({ "message": document })).unwrap();
        assert_eq!(parsed.kind(), MessageKind::Document);
        assert_eq!(parsed.audio_file_id(), None);
    }

    #[test]
    fn test_voice_without_file_id_still_parses() {
        let mut message = base_message();
        message["voice"] = json!({ "duration": 2 });
        let parsed = InboundMessage::from_update(&json!({ "message": message })).unwrap();

        assert_eq!(parsed.kind(), MessageKind::Voice);
        assert_eq!(parsed.audio_file_id(), None);
    }

    #[test]
    fn test_update_without_message_is_skipped() {
        let err = InboundMessage::from_update(&json!({ "update_id": 5, "callback_query": {} }))
            .unwrap_err();
        assert!(matches!(err, IngestionError::NoMessage));
    }

    #[test]
    fn test_message_without_sender_is_malformed() {
        let err = InboundMessage::from_update(&json!({
            "message": { "message_id": 1, "chat": { "id": 1 }, "date": 0, "text": "hi" }
        }))
        .unwrap_err();
        assert!(matches!(err, IngestionError::Malformed(_)));
    }

    #[test]
    fn test_non_object_update_is_malformed() {
        let err = InboundMessage::from_update(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, IngestionError::Malformed(_)));
    }
}
