//! Memory statistics for the `/stats` report.

use concierge_core::turn::{Session, Speaker};
use std::collections::BTreeMap;

use crate::preferences::PreferenceStore;

/// Topic buckets for user turns, checked in order; the first hit wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("weather", &["weather", "temperature", "rain", "sunny", "天氣", "氣溫", "下雨"]),
    ("schedule", &["meeting", "schedule", "calendar", "appointment", "會議", "安排", "日程"]),
    ("email", &["email", "mail", "inbox", "郵件", "信件"]),
    ("personal", &["my ", "i like", "i love", "prefer", "我的", "喜歡", "偏好"]),
    ("work", &["work", "project", "company", "工作", "公司", "專案"]),
];

/// Which topic a user utterance is about, or `"general"`.
pub fn categorize(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(name, _)| *name)
        .unwrap_or("general")
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStats {
    pub turns: usize,
    pub user_turns: usize,
    /// User turns per topic
    pub categories: BTreeMap<&'static str, usize>,
    /// Facts remembered for the session's user
    pub user_preferences: usize,
    /// Facts remembered across all users
    pub total_preferences: usize,
    pub estimated_tokens: usize,
}

impl MemoryStats {
    pub fn collect(session: &Session, preferences: &PreferenceStore) -> Self {
        let mut categories = BTreeMap::new();
        let mut user_turns = 0;
        for turn in session.turns().iter().filter(|t| t.speaker == Speaker::User) {
            user_turns += 1;
            *categories.entry(categorize(&turn.text)).or_insert(0) += 1;
        }

        Self {
            turns: session.len(),
            user_turns,
            categories,
            user_preferences: preferences.get(session.user_id()).len(),
            total_preferences: preferences.preference_count(),
            estimated_tokens: session.estimated_tokens(),
        }
    }
}

impl std::fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "turns: {} ({} from you, ~{} tokens)", self.turns, self.user_turns, self.estimated_tokens)?;
        let topics: Vec<String> = self.categories.iter().map(|(k, v)| format!("{k} {v}")).collect();
        if !topics.is_empty() {
            writeln!(f, "topics: {}", topics.join(", "))?;
        }
        write!(
            f,
            "preferences: {} for you, {} in total",
            self.user_preferences, self.total_preferences
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::turn::Turn;

    #[test]
    fn categorize_by_first_match() {
        assert_eq!(categorize("What's the weather in Tokyo?"), "weather");
        assert_eq!(categorize("Schedule a meeting at 3"), "schedule");
        assert_eq!(categorize("Any new email?"), "email");
        assert_eq!(categorize("I like green tea"), "personal");
        assert_eq!(categorize("台北天氣如何"), "weather");
        assert_eq!(categorize("Tell me a joke"), "general");
    }

    #[test]
    fn collect_counts_turns_topics_and_preferences() {
        let mut session = Session::new("alice");
        session.push(Turn::user("Weather in Tokyo?"));
        session.push(Turn::assistant("Light rain."));
        session.push(Turn::user("Any email from HR?"));
        session.push(Turn::assistant("One message."));
        session.push(Turn::user("Tell me a joke"));

        let mut prefs = PreferenceStore::new();
        prefs.set("alice", "city", "Taipei");
        prefs.set("bob", "likes", "tea");
        prefs.set("bob", "city", "London");

        let stats = MemoryStats::collect(&session, &prefs);
        assert_eq!(stats.turns, 5);
        assert_eq!(stats.user_turns, 3);
        assert_eq!(stats.categories["weather"], 1);
        assert_eq!(stats.categories["email"], 1);
        assert_eq!(stats.categories["general"], 1);
        assert_eq!(stats.user_preferences, 1);
        assert_eq!(stats.total_preferences, 3);
        assert!(stats.to_string().contains("preferences: 1 for you, 3 in total"));
    }

    #[test]
    fn empty_session() {
        let stats = MemoryStats::collect(&Session::new("alice"), &PreferenceStore::new());
        assert_eq!(stats.turns, 0);
        assert!(stats.categories.is_empty());
        assert!(!stats.to_string().contains("topics"));
    }
}
