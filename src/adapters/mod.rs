//! Adapter interfaces for external systems.
//!
//! Adapters wrap the Telegram Bot API (file download) and the speech-to-text
//! provider behind the [`MediaTranscriber`] trait, so the ingestion pipeline
//! can be driven by fakes in tests.

pub mod telegram;
pub mod whisper;

use async_trait::async_trait;
use thiserror::Error;

// Re-export the concrete clients
pub use telegram::{DownloadedFile, TelegramClient, TelegramConfig};
pub use whisper::WhisperClient;

/// Any failure while fetching or transcribing an attachment
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("attachment has no file_id")]
    MissingFileId,

    #[error("Telegram getFile failed: {status}")]
    FileLookup { status: u16 },

    #[error("Telegram getFile error: {0}")]
    Platform(String),

    #[error("Telegram getFile returned no file_path")]
    MissingFilePath,

    #[error("Telegram download failed: {status}")]
    Download { status: u16 },

    #[error("Whisper API error {status}: {body}")]
    Provider { status: u16, body: String },
}

/// Turns a voice/audio attachment into text
#[async_trait]
pub trait MediaTranscriber: Send + Sync {
    /// Human-readable transcriber name
    fn name(&self) -> &str;

    /// Transcribe the attachment identified by `file_id`.
    ///
    /// Single attempt; any failure along the way is returned as-is.
    async fn transcribe(&self, file_id: &str) -> Result<String, TranscriptionError>;
}

/// Downloads from Telegram, transcribes with Whisper
pub struct TelegramWhisperTranscriber {
    telegram: TelegramClient,
    whisper: WhisperClient,
}

impl TelegramWhisperTranscriber {
    pub fn new(telegram: TelegramClient, whisper: WhisperClient) -> Self {
        Self { telegram, whisper }
    }
}

#[async_trait]
impl MediaTranscriber for TelegramWhisperTranscriber {
    fn name(&self) -> &str {
        "telegram+whisper"
    }

    async fn transcribe(&self, file_id: &str) -> Result<String, TranscriptionError> {
        let DownloadedFile { bytes, extension } = self.telegram.download_file(file_id).await?;
        self.whisper.transcribe_bytes(bytes, &extension).await
    }
}
