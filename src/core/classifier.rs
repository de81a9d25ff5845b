//! Keyword-based project classification.
//!
//! Three phases, each returning on the first match:
//!
//! 1. **Prefix rules**: a rule ending in `:` whose keyword starts the text
//!    ("Squire: fix login"). Rules are tried in the given (priority) order.
//! 2. **Colon split**: the text before the first `:` (if it appears within
//!    the first 40 characters) equals a rule keyword exactly.
//! 3. **Substring**: the longest non-prefix keyword contained anywhere in the
//!    text. Priority plays no part here; ties keep the given order.
//!
//! All comparisons are case-insensitive.

use crate::domain::{KeywordRule, UNCATEGORIZED};

/// The colon in phase 2 must sit before this character index
const COLON_SPLIT_LIMIT: usize = 40;

/// Classify `text` into a project id using `rules` (priority-descending).
pub fn classify(text: Option<&str>, rules: &[KeywordRule]) -> String {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return UNCATEGORIZED.to_string();
    };

    let lower = text.to_lowercase();
    let lower = lower.trim();
    let rules: Vec<&KeywordRule> = rules.iter().filter(|r| !r.keyword.is_empty()).collect();

    match_prefix_rule(lower, &rules)
        .or_else(|| match_colon_split(lower, &rules))
        .or_else(|| match_substring(lower, &rules))
        .map(|rule| rule.project_id.clone())
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

/// Phase 1: "Name:" rules that prefix the text
fn match_prefix_rule<'a>(lower: &str, rules: &[&'a KeywordRule]) -> Option<&'a KeywordRule> {
    rules
        .iter()
        .copied()
        .filter(|rule| rule.is_prefix())
        .find(|rule| lower.starts_with(&rule.keyword.to_lowercase()))
}

/// Phase 2: "name: ..." where "name" is a keyword
fn match_colon_split<'a>(lower: &str, rules: &[&'a KeywordRule]) -> Option<&'a KeywordRule> {
    let colon = lower.find(':')?;
    let char_index = lower[..colon].chars().count();
    if char_index == 0 || char_index >= COLON_SPLIT_LIMIT {
        return None;
    }

    let prefix = lower[..colon].trim();
    rules
        .iter()
        .copied()
        .find(|rule| rule.keyword.to_lowercase() == prefix)
}

/// Phase 3: longest contained keyword
fn match_substring<'a>(lower: &str, rules: &[&'a KeywordRule]) -> Option<&'a KeywordRule> {
    let mut by_length: Vec<&KeywordRule> = rules
        .iter()
        .copied()
        .filter(|rule| !rule.is_prefix())
        .collect();
    // Stable sort keeps priority order among equal lengths
    by_length.sort_by(|a, b| b.keyword.chars().count().cmp(&a.keyword.chars().count()));

    by_length
        .into_iter()
        .find(|rule| lower.contains(&rule.keyword.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(keyword: &str, project: &str, priority: i64) -> KeywordRule {
        KeywordRule::new(keyword, project, priority)
    }

    #[test]
    fn test_missing_or_empty_text_is_uncategorized() {
        let rules = vec![rule("login", "auth", 1)];
        assert_eq!(classify(None, &rules), "uncategorized");
        assert_eq!(classify(Some(""), &rules), "uncategorized");
    }

    #[test]
    fn test_no_match_is_uncategorized() {
        let rules = vec![rule("login", "auth", 1)];
        assert_eq!(classify(Some("lunch at noon?"), &rules), "uncategorized");
    }

    #[test]
    fn test_prefix_rule_ignores_case_and_leading_space() {
        let rules = vec![rule("Squire:", "squire", 0)];
        assert_eq!(classify(Some("  SQUIRE: deploy"), &rules), "squire");
    }

    #[test]
    fn test_prefix_rule_beats_higher_priority_substring() {
        let rules = vec![rule("deploy", "ops", 10), rule("Squire:", "squire", 0)];
        assert_eq!(classify(Some("Squire: deploy the thing"), &rules), "squire");
    }

    #[test]
    fn test_first_prefix_rule_in_order_wins() {
        let rules = vec![rule("sq:", "first", 5), rule("sq:", "second", 1)];
        assert_eq!(classify(Some("sq: hello"), &rules), "first");
    }

    #[test]
    fn test_colon_split_beats_longer_substring() {
        let rules = vec![rule("Orbit", "orbit", 0), rule("refresh the dashboard", "dash", 0)];
        assert_eq!(classify(Some("orbit : refresh the dashboard"), &rules), "orbit");
    }

    #[test]
    fn test_colon_split_requires_exact_prefix() {
        let rules = vec![rule("orbit", "orbit", 5), rule("orbit thing", "thing", 0)];
        assert_eq!(classify(Some("my orbit: orbit thing"), &rules), "thing");
    }

    #[test]
    fn test_blank_keywords_and_leading_colon_never_match() {
        let rules = vec![rule("", "nothing", 0), rule("zzz", "never", 0)];
        assert_eq!(classify(Some(": leading colon"), &rules), "uncategorized");
    }

    #[test]
    fn test_colon_split_only_within_first_forty_chars() {
        let long_substring = "b".repeat(41);

        let near = "a".repeat(39);
        let rules = vec![rule(&near, "split", 0), rule(&long_substring, "substring", 0)];
        let text = format!("{}: {}", near, long_substring);
        assert_eq!(classify(Some(&text), &rules), "split");

        let far = "a".repeat(40);
        let rules = vec![rule(&far, "split", 0), rule(&long_substring, "substring", 0)];
        let text = format!("{}: {}", far, long_substring);
        assert_eq!(classify(Some(&text), &rules), "substring");
    }

    #[test]
    fn test_substring_prefers_longest_keyword_over_priority() {
        let rules = vec![rule("login", "auth", 100), rule("login page", "web", 1)];
        assert_eq!(classify(Some("the login page is broken"), &rules), "web");
    }

    #[test]
    fn test_substring_equal_length_keeps_priority_order() {
        let rules = vec![rule("alpha", "first", 9), rule("gamma", "second", 1)];
        assert_eq!(classify(Some("gamma and alpha"), &rules), "first");
    }

    #[test]
    fn test_prefix_keywords_are_not_used_as_substrings() {
        let rules = vec![rule("squire:", "squire", 0)];
        assert_eq!(classify(Some("ask squire: later"), &rules), "uncategorized");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let rules = vec![
            rule("Squire:", "squire", 3),
            rule("bug", "bugs", 2),
            rule("login bug", "auth", 1),
        ];
        let text = Some("please fix the login bug");
        let first = classify(text, &rules);
        for _ in 0..10 {
            assert_eq!(classify(text, &rules), first);
        }
        assert_eq!(first, "auth");
    }
}
