//! Read-through cache of keyword rules.
//!
//! Rules are refreshed from their source at most once per TTL. A failed
//! refresh keeps serving whatever was cached before (possibly nothing), so
//! classification degrades to "uncategorized" instead of failing ingestion.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::KeywordRule;

use super::clock::Clock;

/// Default time a fetched rule set stays fresh
pub const DEFAULT_TTL_SECONDS: i64 = 5 * 60;

/// Where rules come from
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Fetch the full current rule set
    async fn fetch_rules(&self) -> Result<Vec<KeywordRule>>;
}

#[derive(Debug, Default)]
struct CacheState {
    rules: Vec<KeywordRule>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl CacheState {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.refreshed_at {
            Some(at) => !self.rules.is_empty() && now - at < ttl,
            None => false,
        }
    }
}

/// TTL cache in front of a [`RuleSource`]
pub struct KeywordCache {
    source: Arc<dyn RuleSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl KeywordCache {
    pub fn new(source: Arc<dyn RuleSource>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(source, clock, Duration::seconds(DEFAULT_TTL_SECONDS))
    }

    pub fn with_ttl(source: Arc<dyn RuleSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            clock,
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Current rules, highest priority first.
    ///
    /// Never fails: a refresh error falls back to the stale set.
    pub async fn get_rules(&self) -> Vec<KeywordRule> {
        let now = self.clock.now();

        {
            let state = self.state.read().await;
            if state.is_fresh(now, self.ttl) {
                return state.rules.clone();
            }
        }

        match self.source.fetch_rules().await {
            Ok(mut rules) => {
                rules.sort_by(|a, b| b.priority.cmp(&a.priority));
                debug!(count = rules.len(), "Refreshed keyword rules");

                let mut state = self.state.write().await;
                state.rules = rules.clone();
                state.refreshed_at = Some(now);
                rules
            }
            Err(e) => {
                let state = self.state.read().await;
                warn!(
                    error = %e,
                    cached = state.rules.len(),
                    "Keyword refresh failed, serving cached rules"
                );
                state.rules.clone()
            }
        }
    }
}
