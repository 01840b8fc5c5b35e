//! Turn and Session domain types.
//!
//! A session is the append-only log of everything said in one conversation.
//! Turns can be pushed and read, never edited, removed or reordered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The end user
    User,
    /// The assistant
    Assistant,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One utterance by either the user or the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The ordered turn history of one conversation plus the user it belongs to.
///
/// The user id is the key into the preference store; the session itself
/// never holds preference values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    user_id: String,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Start an empty session for `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            user_id: user_id.into(),
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a turn to the end of the log.
    pub fn push(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `window` turns, oldest first.
    pub fn recent(&self, window: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(window);
        &self.turns[start..]
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Case-insensitive keyword search over the log, newest first.
    pub fn search(&self, keyword: &str) -> Vec<&Turn> {
        let needle = keyword.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.turns
            .iter()
            .rev()
            .filter(|t| t.text.to_lowercase().contains(&needle))
            .collect()
    }

    /// Rough token count estimate (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.turns.iter().map(|t| t.text.len() / 4).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_input_order() {
        let mut session = Session::new("alice");
        for i in 0..10 {
            session.push(Turn::user(format!("message {i}")));
        }
        let texts: Vec<_> = session.turns().iter().map(|t| t.text.as_str()).collect();
        let expected: Vec<_> = (0..10).map(|i| format!("message {i}")).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut session = Session::new("alice");
        session.push(Turn::user("one"));
        session.push(Turn::assistant("two"));
        session.push(Turn::user("three"));

        let tail = session.recent(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].text, "two");
        assert_eq!(tail[1].text, "three");
        assert_eq!(session.recent(100).len(), 3);
        assert!(session.recent(0).is_empty());
    }

    #[test]
    fn search_is_newest_first_and_case_insensitive() {
        let mut session = Session::new("alice");
        session.push(Turn::user("Weather in Tokyo?"));
        session.push(Turn::assistant("Tokyo is sunny"));
        session.push(Turn::user("thanks"));

        let hits = session.search("tokyo");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Tokyo is sunny");
        assert!(session.search("").is_empty());
    }

    #[test]
    fn speaker_serializes_lowercase() {
        let turn = Turn::assistant("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"assistant\""));
    }

    #[test]
    fn token_estimate() {
        let mut session = Session::new("alice");
        // 20 chars ≈ 5 tokens
        session.push(Turn::user("12345678901234567890"));
        assert_eq!(session.estimated_tokens(), 5);
    }
}
