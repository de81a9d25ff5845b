//! Keyword rules used to classify messages into projects.

use serde::{Deserialize, Serialize};

/// One keyword-to-project mapping.
///
/// A keyword ending in `:` is a prefix rule ("Squire:"); anything else is
/// matched as a substring of the message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub project_id: String,

    /// Higher is evaluated first within the prefix phases
    #[serde(default)]
    pub priority: i64,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, project_id: impl Into<String>, priority: i64) -> Self {
        Self {
            keyword: keyword.into(),
            project_id: project_id.into(),
            priority,
        }
    }

    /// Whether this is a `Name:` prefix rule
    pub fn is_prefix(&self) -> bool {
        self.keyword.ends_with(':')
    }
}
