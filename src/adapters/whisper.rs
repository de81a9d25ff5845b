//! Speech-to-text adapter for an OpenAI-compatible transcription endpoint.
//!
//! Sends one file per request as multipart form data and returns the text.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::TranscriptionError;

/// Default transcription endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Default transcription model
pub const DEFAULT_MODEL: &str = "whisper-1";

/// Content type attached to every upload (Telegram voice notes are Ogg/Opus)
const UPLOAD_CONTENT_TYPE: &str = "audio/ogg";

/// Transcription API client
pub struct WhisperClient {
    api_key: String,
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperClient {
    pub fn new(api_key: String, endpoint: String, model: String) -> Self {
        Self {
            api_key,
            endpoint,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Transcribe raw audio bytes labelled with `extension`
    pub async fn transcribe_bytes(
        &self,
        bytes: Vec<u8>,
        extension: &str,
    ) -> Result<String, TranscriptionError> {
        let file_part = Part::bytes(bytes)
            .file_name(format!("voice.{}", extension))
            .mime_str(UPLOAD_CONTENT_TYPE)?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let result: TranscriptionResponse = response.json().await?;
        Ok(result.text)
    }
}
