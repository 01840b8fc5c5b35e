//! Keyword recall over the turn log.
//!
//! Older exchanges fall out of the history window sent to the model. Recall
//! scores them against the current utterance by keyword overlap (Jaccard)
//! and hands the best few back so they can ride along as context.

use chrono::{DateTime, Utc};
use concierge_core::turn::{Speaker, Turn};
use std::collections::HashSet;

/// Exchanges recalled per model call.
pub const RECALL_LIMIT: usize = 5;

/// Keywords kept per text, in order of appearance.
const KEYWORD_LIMIT: usize = 10;

/// Characters of each side quoted in a recollection.
const SNIPPET_CHARS: usize = 50;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "and", "a", "to", "as", "are", "was", "will", "be", "have",
    "has", "had", "do", "does", "did", "it", "in", "of", "for", "what", "how", "my", "me", "you",
    "非常",
];

/// Lowercased words of two or more characters, stop words removed.
pub fn keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        .take(KEYWORD_LIMIT)
        .map(str::to_string)
        .collect()
}

/// An earlier user/assistant exchange judged relevant to the current one.
#[derive(Debug, Clone, PartialEq)]
pub struct Recollection {
    pub timestamp: DateTime<Utc>,
    pub user_text: String,
    pub assistant_text: String,
    /// Jaccard overlap with the query, in `(0, 1]`
    pub score: f64,
}

impl std::fmt::Display for Recollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] user: {}",
            self.timestamp.format("%m-%d %H:%M"),
            snippet(&self.user_text)
        )?;
        if !self.assistant_text.is_empty() {
            write!(f, " / assistant: {}", snippet(&self.assistant_text))?;
        }
        Ok(())
    }
}

fn snippet(text: &str) -> String {
    let mut out: String = text.chars().take(SNIPPET_CHARS).collect();
    if text.chars().count() > SNIPPET_CHARS {
        out.push_str("...");
    }
    out
}

/// The `limit` exchanges in `turns` that best match `query`, best first.
///
/// Each user turn is paired with the assistant turn right after it; the
/// pair's keywords are compared with the query's. Exchanges sharing no
/// keyword are skipped. Ties go to the newer exchange.
pub fn recall(turns: &[Turn], query: &str, limit: usize) -> Vec<Recollection> {
    let wanted: HashSet<String> = keywords(query).into_iter().collect();
    if wanted.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut found: Vec<Recollection> = turns
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, turn)| turn.speaker == Speaker::User)
        .filter_map(|(i, turn)| {
            let assistant_text = turns
                .get(i + 1)
                .filter(|next| next.speaker == Speaker::Assistant)
                .map(|next| next.text.clone())
                .unwrap_or_default();

            let mut have: HashSet<String> = keywords(&turn.text).into_iter().collect();
            have.extend(keywords(&assistant_text));

            let overlap = wanted.intersection(&have).count();
            if overlap == 0 {
                return None;
            }
            let union = wanted.union(&have).count();
            Some(Recollection {
                timestamp: turn.timestamp,
                user_text: turn.text.clone(),
                assistant_text,
                score: overlap as f64 / union as f64,
            })
        })
        .collect();

    // Stable sort keeps newest-first order among equal scores.
    found.sort_by(|a, b| b.score.total_cmp(&a.score));
    found.truncate(limit);
    found
}
