//! Telegram Bot API adapter for fetching voice/audio attachments.
//!
//! Downloading a file is a two-call contract: `getFile` resolves a file id
//! to a `file_path`, then the bytes are fetched from the file endpoint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TranscriptionError;

/// Default Bot API host
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Extension used when the file path has none
pub const FALLBACK_EXTENSION: &str = "oga";

/// Telegram Bot API client
pub struct TelegramClient {
    /// Bot token
    bot_token: String,
    /// API host, e.g. https://api.telegram.org
    api_base: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Response envelope from the Telegram API
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Result of getFile
#[derive(Debug, Deserialize)]
struct FileResult {
    file_path: Option<String>,
}

/// Configuration for Telegram client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// A downloaded attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    /// Extension taken from the resolved file path
    pub extension: String,
}

impl TelegramClient {
    /// Create a new Telegram client
    pub fn new(bot_token: String, api_base: String) -> Self {
        Self {
            bot_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from config
    pub fn from_config(config: TelegramConfig) -> Self {
        Self::new(config.bot_token, config.api_base)
    }

    /// Build API URL
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Build file download URL
    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.bot_token, file_path)
    }

    /// Resolve a file id to its download path
    pub async fn get_file_path(&self, file_id: &str) -> Result<String, TranscriptionError> {
        let response = self
            .client
            .get(self.api_url("getFile"))
            .query(&[("file_id", file_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptionError::FileLookup {
                status: status.as_u16(),
            });
        }

        let result: TelegramResponse<FileResult> = response.json().await?;
        if !result.ok {
            return Err(TranscriptionError::Platform(
                result.description.unwrap_or_default(),
            ));
        }

        result
            .result
            .and_then(|r| r.file_path)
            .filter(|p| !p.is_empty())
            .ok_or(TranscriptionError::MissingFilePath)
    }

    /// Download a file by id
    pub async fn download_file(&self, file_id: &str) -> Result<DownloadedFile, TranscriptionError> {
        let file_path = self.get_file_path(file_id).await?;
        debug!(%file_path, "Resolved Telegram file");

        let response = self.client.get(self.file_url(&file_path)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptionError::Download {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        Ok(DownloadedFile {
            bytes,
            extension: extension_of(&file_path),
        })
    }
}

/// Extension after the last `.` of the final path segment, or `oga`
pub fn extension_of(file_path: &str) -> String {
    let name = file_path.rsplit('/').next().unwrap_or(file_path);
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => FALLBACK_EXTENSION.to_string(),
    }
}
