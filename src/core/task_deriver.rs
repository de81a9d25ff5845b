//! Decides whether a stored message becomes a task.
//!
//! Short or conversational messages ("ok", "hey there", "are you up?") are
//! skipped. Everything else becomes a pending task whose priority comes from
//! urgency words in the body.

use crate::domain::{Message, NewTask, TaskSource, TaskStatus};

/// Bodies this short (after trimming) never become tasks
const MIN_TASK_CHARS: usize = 20;

/// Longest title kept verbatim
const MAX_TITLE_CHARS: usize = 80;

/// Openers that mark a message as small talk (matched at the start only)
const TRIVIAL_OPENERS: &[&str] = &[
    "sup",
    "hi",
    "hello",
    "hey",
    "yo",
    "ok",
    "yes",
    "no",
    "are you",
    "test",
    "listen",
    "let me know",
];

const URGENT_TERMS: &[&str] = &["urgent", "asap", "now", "immediately"];
const SOON_TERMS: &[&str] = &["next", "soon", "important"];

/// Derive a task from a persisted message, if it warrants one
pub fn derive_task(message: &Message) -> Option<NewTask> {
    let body = message.text.as_deref()?;
    let trimmed = body.trim();

    if is_trivial(trimmed) || trimmed.chars().count() <= MIN_TASK_CHARS {
        return None;
    }

    Some(NewTask {
        project_id: message.project_id.clone(),
        source: TaskSource::Telegram,
        source_msg_id: Some(message.id),
        title: generate_title(body),
        body: Some(body.to_string()),
        status: TaskStatus::Pending,
        priority: priority_for(body),
    })
}

/// Whether the text opens with a conversational filler
pub fn is_trivial(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    TRIVIAL_OPENERS.iter().any(|opener| lower.starts_with(opener))
}

/// 2 for urgent wording, 1 for "soon"-ish wording, else 0
pub fn priority_for(text: &str) -> u8 {
    let lower = text.to_lowercase();
    if URGENT_TERMS.iter().any(|term| lower.contains(term)) {
        2
    } else if SOON_TERMS.iter().any(|term| lower.contains(term)) {
        1
    } else {
        0
    }
}

/// Collapse whitespace and cap the title at 80 characters
pub fn generate_title(text: &str) -> String {
    let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if clean.chars().count() <= MAX_TITLE_CHARS {
        return clean;
    }

    let mut title: String = clean.chars().take(MAX_TITLE_CHARS - 3).collect();
    title.push_str("...");
    title
}
