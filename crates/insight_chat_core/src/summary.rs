//! crates/insight_chat_core/src/summary.rs
//!
//! The summary policy engine: pure functions deciding when to recompute a
//! user's profile digest and what the digest contains. No I/O here - the
//! service layer is responsible for reading counts and writing the result.

use crate::domain::{Message, MessageRole};
use crate::ports::{PortError, PortResult};
use std::collections::HashMap;

/// Common function/filler words excluded from the digest. This list is part
/// of the summary's compatibility contract and must not be reworded.
const STOP_WORDS: &[&str] = &[
    "what", "when", "where", "which", "this", "that", "these", "those",
    "with", "from", "have", "would", "could", "should", "about", "more",
    "some", "than", "into", "very", "after", "there", "their", "they",
    "been", "being", "were", "will", "your", "also", "just", "only",
    "like", "know", "want", "need", "make", "help", "tell", "show",
];

/// Tokens shorter than this never make it into a digest.
const MIN_TOKEN_LEN: usize = 4;

/// Decides whether the profile digest is due for a recompute.
///
/// This is a periodic trigger: it fires on every `threshold`-th user message
/// (10, 20, 30, ... for threshold 10), never on a count of zero. A zero
/// threshold is a contract violation.
pub fn should_update(user_message_count: u64, threshold: u64) -> PortResult<bool> {
    if threshold == 0 {
        return Err(PortError::Validation(
            "summary threshold must be a positive integer".to_string(),
        ));
    }
    Ok(user_message_count > 0 && user_message_count % threshold == 0)
}

/// Selects the bounded recency window fed to summarization: the contents of
/// the last `limit` user-role messages, in chronological order.
pub fn recent_user_messages(messages: &[Message], limit: usize) -> Vec<String> {
    let user_texts: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .collect();

    let start = user_texts.len().saturating_sub(limit);
    user_texts[start..].iter().map(|s| s.to_string()).collect()
}

/// Generates the frequency-based profile digest from recent user messages.
///
/// Returns the empty string when there is nothing worth summarizing; the
/// caller must treat "" as "do not write". Equal-frequency tokens are ordered
/// by first occurrence in the combined input, which keeps the output
/// deterministic for a given message history.
pub fn generate_summary(texts: &[String], top_n: usize) -> String {
    if texts.is_empty() || top_n == 0 {
        return String::new();
    }

    let combined = texts.join(" ").to_lowercase();

    // Maximal runs of lowercase letters; digits and punctuation break tokens.
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut order = 0usize;
    for token in combined.split(|c: char| !c.is_ascii_lowercase()) {
        if token.len() < MIN_TOKEN_LEN || STOP_WORDS.contains(&token) {
            continue;
        }
        let entry = counts.entry(token).or_insert_with(|| {
            order += 1;
            (0, order)
        });
        entry.0 += 1;
    }

    if counts.is_empty() {
        return String::new();
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(token, (count, first_seen))| (token, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.truncate(top_n);

    let top_words: Vec<&str> = ranked.iter().map(|(token, _, _)| *token).collect();
    format!("User often discusses: {}", top_words.join(", "))
}
