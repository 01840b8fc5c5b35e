//! Remembered per-user facts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::provider::ToolDefinition;

/// A user's preference record: fact-key → value, ordered by key.
pub type Preferences = BTreeMap<String, String>;

/// Name of the reserved function the model calls to flag a preference.
///
/// Providers translate calls to it into [`PreferenceUpdate`]s instead of
/// tool calls, so it never reaches the tool dispatcher.
pub const REMEMBER_PREFERENCE: &str = "remember_preference";

/// A single fact the model extracted from the user's utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    pub key: String,
    pub value: String,
}

impl PreferenceUpdate {
    /// Build an update, normalizing the key to `snake_case`.
    ///
    /// Returns `None` when the key or value is blank.
    pub fn new(key: &str, value: &str) -> Option<Self> {
        let key = normalize_key(key);
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self {
            key,
            value: value.to_string(),
        })
    }

    /// Parse the arguments of a `remember_preference` call.
    pub fn from_arguments(arguments: &serde_json::Value) -> Option<Self> {
        let key = arguments.get("key")?.as_str()?;
        let value = match arguments.get("value")? {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self::new(key, &value)
    }
}

/// Lowercase, trim, and collapse whitespace/dashes into underscores.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// The function declaration advertised to the model for preference capture.
pub fn remember_preference_definition() -> ToolDefinition {
    ToolDefinition {
        name: REMEMBER_PREFERENCE.to_string(),
        description: "Remember a stable fact or preference the user revealed about themselves \
                      (home city, name, likes, dislikes). Call it alongside your reply; \
                      do not use it for one-off requests."
            .to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Short snake_case fact name, e.g. city, name, likes_coffee"
                },
                "value": {
                    "type": "string",
                    "description": "The remembered value"
                }
            },
            "required": ["key", "value"]
        }),
    }
}
