//! Command-line interface for orbit-bridge.
//!
//! Provides commands for running the webhook service, managing keyword
//! rules, pushing a single update through the pipeline, and inspecting the
//! resolved configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::adapters::{
    MediaTranscriber, TelegramClient, TelegramWhisperTranscriber, WhisperClient,
};
use crate::api::{self, AppState};
use crate::config::{self, Settings};
use crate::core::{Clock, IngestionOrchestrator, KeywordCache, QueryService, SystemClock};
use crate::domain::KeywordRule;
use crate::store::{SqliteStore, Store};

/// orbit-bridge - Telegram to project inbox bridge
#[derive(Parser, Debug)]
#[command(name = "orbit-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to orbit-bridge.yaml in this or a parent directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage classification keywords
    Keywords {
        #[command(subcommand)]
        command: KeywordCommands,
    },

    /// Run one webhook update (JSON file) through the pipeline and print the outcome
    Ingest {
        /// Path to the update JSON
        file: PathBuf,
    },

    /// Show resolved configuration
    Config,
}

#[derive(Subcommand, Debug)]
pub enum KeywordCommands {
    /// List rules, highest priority first
    List,

    /// Add a rule
    Add {
        /// Keyword or phrase; end with ':' for a prefix rule
        keyword: String,

        /// Project the keyword routes to
        project_id: String,

        /// Higher priority is checked first among prefix rules
        #[arg(short, long, default_value = "0")]
        priority: i64,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut settings = config::load(self.config.as_deref())?;
        if let Some(database) = self.database {
            settings.database_path = database;
        }

        match self.command {
            Commands::Serve { port } => {
                if let Some(port) = port {
                    settings.port = port;
                }
                serve(settings).await
            }
            Commands::Keywords { command } => execute_keywords(&settings, command).await,
            Commands::Ingest { file } => ingest_file(settings, &file).await,
            Commands::Config => {
                println!("{}", settings.describe());
                Ok(())
            }
        }
    }
}

async fn execute_keywords(settings: &Settings, command: KeywordCommands) -> Result<()> {
    let store = open_store(&settings.database_path)?;

    match command {
        KeywordCommands::List => {
            let rules = store.keyword_rules().await?;
            if rules.is_empty() {
                println!("No keyword rules");
                return Ok(());
            }

            println!("{:<30} {:<20} {:>8}", "KEYWORD", "PROJECT", "PRIORITY");
            println!("{}", "-".repeat(60));
            for rule in rules {
                println!("{:<30} {:<20} {:>8}", rule.keyword, rule.project_id, rule.priority);
            }
        }
        KeywordCommands::Add {
            keyword,
            project_id,
            priority,
        } => {
            let keyword = keyword.trim().to_string();
            if keyword.is_empty() {
                anyhow::bail!("Keyword must not be empty");
            }
            store
                .insert_keyword_rule(KeywordRule::new(keyword.clone(), project_id.clone(), priority))
                .await?;
            println!("Added '{}' -> {} (priority {})", keyword, project_id, priority);
        }
    }

    Ok(())
}

async fn serve(settings: Settings) -> Result<()> {
    let store = open_store(&settings.database_path)?;
    seed_keywords(store.as_ref(), &settings.keywords.seed).await?;

    let state = build_state(&settings, store);
    info!(
        port = settings.port,
        database = %settings.database_path.display(),
        transcription = state.orchestrator.transcription_enabled(),
        "Starting orbit-bridge"
    );

    api::serve(state, settings.port).await
}

async fn ingest_file(settings: Settings, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read update: {}", file.display()))?;
    let update: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse update: {}", file.display()))?;

    let store = open_store(&settings.database_path)?;
    seed_keywords(store.as_ref(), &settings.keywords.seed).await?;

    let state = build_state(&settings, store);
    let outcome = state.orchestrator.process(update).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn open_store(path: &Path) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Insert the configured seed rules into an empty rules table
async fn seed_keywords(store: &dyn Store, seed: &[KeywordRule]) -> Result<()> {
    if seed.is_empty() || !store.keyword_rules().await?.is_empty() {
        return Ok(());
    }

    for rule in seed {
        store.insert_keyword_rule(rule.clone()).await?;
    }
    info!(count = seed.len(), "Seeded keyword rules");
    Ok(())
}

/// Transcriber, when both the bot token and provider key are configured
fn build_transcriber(settings: &Settings) -> Option<Arc<dyn MediaTranscriber>> {
    if !settings.transcription_configured() {
        return None;
    }
    let telegram = settings.telegram_config()?;
    let api_key = settings.transcription.api_key.clone()?;

    let whisper = WhisperClient::new(
        api_key,
        settings.transcription.endpoint.clone(),
        settings.transcription.model.clone(),
    );
    Some(Arc::new(TelegramWhisperTranscriber::new(
        TelegramClient::from_config(telegram),
        whisper,
    )))
}

/// Wire the store, cache and services together
pub fn build_state(settings: &Settings, store: Arc<SqliteStore>) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let keywords = Arc::new(KeywordCache::with_ttl(
        store.clone(),
        clock.clone(),
        settings.keywords.cache_ttl,
    ));

    let orchestrator = Arc::new(IngestionOrchestrator::new(
        store.clone(),
        keywords.clone(),
        build_transcriber(settings),
    ));
    let queries = Arc::new(QueryService::new(store, keywords, clock));

    AppState::new(orchestrator, queries)
}
