//! Configuration for orbit-bridge.
//!
//! Configuration sources (highest priority first):
//! 1. CLI flags (`--port`, `--database`)
//! 2. Environment variables (PORT, ORBIT_DATABASE, TELEGRAM_BOT_TOKEN,
//!    OPENAI_API_KEY, ORBIT_KEYWORD_TTL)
//! 3. Config file (orbit-bridge.yaml)
//! 4. Defaults (~/.orbit-bridge)
//!
//! Config file discovery:
//! - `--config` wins; otherwise the current directory and its parents are
//!   searched for orbit-bridge.yaml
//! - A relative `database_path` in the file is relative to the file's directory

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::telegram::{TelegramConfig, DEFAULT_API_BASE};
use crate::adapters::whisper::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::core::DEFAULT_TTL_SECONDS;
use crate::domain::KeywordRule;

/// Config file name searched for in the working directory and its parents
pub const CONFIG_FILE_NAME: &str = "orbit-bridge.yaml";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub port: Option<u16>,
    pub database_path: Option<String>,
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub transcription: TranscriptionSection,
    #[serde(default)]
    pub keywords: KeywordsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptionSection {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordsSection {
    pub cache_ttl_seconds: Option<i64>,
    /// Rules inserted when the rules table is empty
    #[serde(default)]
    pub seed: Vec<KeywordRule>,
}

/// Resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub database_path: PathBuf,
    pub telegram: TelegramSettings,
    pub transcription: TranscriptionSettings,
    pub keywords: KeywordSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct TranscriptionSettings {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct KeywordSettings {
    pub cache_ttl: chrono::Duration,
    pub seed: Vec<KeywordRule>,
}

impl Settings {
    /// Telegram client config, if a bot token is set
    pub fn telegram_config(&self) -> Option<TelegramConfig> {
        self.telegram.bot_token.as_ref().map(|token| TelegramConfig {
            bot_token: token.clone(),
            api_base: self.telegram.api_base.clone(),
        })
    }

    /// Transcription needs both the bot token and the provider key
    pub fn transcription_configured(&self) -> bool {
        self.telegram.bot_token.is_some() && self.transcription.api_key.is_some()
    }

    /// Human-readable dump with secrets masked
    pub fn describe(&self) -> String {
        let config_file = self
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());

        format!(
            "config_file: {}\n\
             port: {}\n\
             database_path: {}\n\
             telegram.bot_token: {}\n\
             telegram.api_base: {}\n\
             transcription.api_key: {}\n\
             transcription.endpoint: {}\n\
             transcription.model: {}\n\
             keywords.cache_ttl_seconds: {}\n\
             keywords.seed: {} rule(s)",
            config_file,
            self.port,
            self.database_path.display(),
            mask_secret(self.telegram.bot_token.as_deref()),
            self.telegram.api_base,
            mask_secret(self.transcription.api_key.as_deref()),
            self.transcription.endpoint,
            self.transcription.model,
            self.keywords.cache_ttl.num_seconds(),
            self.keywords.seed.len(),
        )
    }
}

/// Show only the last four characters of a secret
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "(unset)".to_string(),
        Some(s) => {
            let chars: Vec<char> = s.chars().collect();
            if chars.len() <= 4 {
                "****".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("****{}", tail)
            }
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Keyword cache TTL; negative or unrepresentable values are rejected
fn keyword_ttl(seconds: i64) -> Result<chrono::Duration> {
    if seconds < 0 {
        anyhow::bail!("Keyword cache TTL must not be negative: {}", seconds);
    }
    chrono::Duration::try_seconds(seconds)
        .with_context(|| format!("Keyword cache TTL out of range: {}", seconds))
}

/// Merge file and environment over the defaults
fn resolve<F>(file: ConfigFile, config_file: Option<PathBuf>, env: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let port = match non_empty(env("PORT")) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid PORT: {}", raw))?,
        None => file.port.unwrap_or(DEFAULT_PORT),
    };

    let database_path = if let Some(path) = non_empty(env("ORBIT_DATABASE")) {
        PathBuf::from(path)
    } else if let Some(ref path) = file.database_path {
        let base = config_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(Path::new("."));
        resolve_path(base, path)
    } else {
        dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".orbit-bridge")
            .join("orbit.db")
    };

    let cache_ttl_seconds = match non_empty(env("ORBIT_KEYWORD_TTL")) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid ORBIT_KEYWORD_TTL: {}", raw))?,
        None => file.keywords.cache_ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS),
    };
    let cache_ttl = keyword_ttl(cache_ttl_seconds)?;

    Ok(Settings {
        port,
        database_path,
        telegram: TelegramSettings {
            bot_token: non_empty(env("TELEGRAM_BOT_TOKEN")).or(non_empty(file.telegram.bot_token)),
            api_base: file
                .telegram
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        },
        transcription: TranscriptionSettings {
            api_key: non_empty(env("OPENAI_API_KEY")).or(non_empty(file.transcription.api_key)),
            endpoint: file
                .transcription
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: file
                .transcription
                .model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        },
        keywords: KeywordSettings {
            cache_ttl,
            seed: file.keywords.seed,
        },
        config_file,
    })
}

/// Load settings from all sources.
///
/// `explicit` is the `--config` path; when absent the file is discovered.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let config_file = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    resolve(file, config_file, |key| std::env::var(key).ok())
}
