//! Provider trait: the abstraction over hosted language models.
//!
//! A Provider receives the windowed turn history plus the user's preferences
//! and answers with either text or a single tool call. Any preference the
//! model flagged along the way rides back in [`ModelResponse::preferences`].
//!
//! Implementations: Gemini, OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::preference::{PreferenceUpdate, Preferences};
use crate::tool::ToolCall;
use crate::turn::Turn;

/// Everything the model needs for one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model to use (e.g., "gemini-2.0-flash", "gpt-4o-mini")
    pub model: String,

    /// Assistant persona and rules, without preferences
    pub system_prompt: String,

    /// Ordered turns, oldest first
    pub history: Vec<Turn>,

    /// The user's remembered facts, injected as context
    #[serde(default)]
    pub preferences: Preferences,

    /// Earlier exchanges, outside `history`, that relate to this utterance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recollections: Vec<String>,

    /// Functions the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// A tool call made earlier in this turn, with its result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_exchange: Option<ToolExchange>,

    /// Whether the model may answer with a function call
    #[serde(default = "default_true")]
    pub allow_tool_calls: bool,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

impl ModelRequest {
    /// The system prompt with the preference record and any recalled
    /// exchanges appended.
    pub fn system_instruction(&self) -> String {
        let mut out = self.system_prompt.clone();
        if !self.preferences.is_empty() {
            out.push_str("\n\n## Known user preferences\n");
            for (key, value) in &self.preferences {
                out.push_str(&format!("- {key}: {value}\n"));
            }
        }
        if !self.recollections.is_empty() {
            out.push_str("\n\n## Related earlier conversation\n");
            for line in &self.recollections {
                out.push_str(&format!("- {line}\n"));
            }
        }
        out
    }
}

/// A tool call the model made and the result it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExchange {
    pub call: ToolCall,

    /// Structured result handed back to the model
    pub result: serde_json::Value,
}

/// A function definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the parameters
    pub parameters: serde_json::Value,
}

/// What the model decided to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ModelReply {
    /// A direct textual answer (may be empty if the model only flagged preferences)
    Text(String),
    /// A request to run one tool
    ToolCall(ToolCall),
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub reply: ModelReply,

    /// Facts the model flagged via `remember_preference`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferences: Vec<PreferenceUpdate>,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded
    pub model: String,
}

impl ModelResponse {
    /// A plain text response with no preferences or usage.
    pub fn text(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            reply: ModelReply::Text(text.into()),
            preferences: Vec::new(),
            usage: None,
            model: model.into(),
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The conversation loop calls `complete()` without knowing which backend
/// is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            model: "gemini-2.0-flash".into(),
            system_prompt: "You are helpful.".into(),
            history: vec![Turn::user("hi")],
            preferences: Preferences::new(),
            recollections: vec![],
            tools: vec![],
            tool_exchange: None,
            allow_tool_calls: true,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    #[test]
    fn system_instruction_without_preferences() {
        assert_eq!(request().system_instruction(), "You are helpful.");
    }

    #[test]
    fn system_instruction_lists_preferences() {
        let mut req = request();
        req.preferences.insert("city".into(), "Taipei".into());
        req.preferences.insert("likes".into(), "coffee".into());
        let text = req.system_instruction();
        assert!(text.starts_with("You are helpful."));
        assert!(text.contains("- city: Taipei"));
        assert!(text.contains("- likes: coffee"));
    }

    #[test]
    fn system_instruction_lists_recollections_after_preferences() {
        let mut req = request();
        req.preferences.insert("city".into(), "Taipei".into());
        req.recollections.push("[06-10 09:00] user: Weather in Tokyo?".into());
        let text = req.system_instruction();
        let prefs_at = text.find("## Known user preferences").unwrap();
        let recall_at = text.find("## Related earlier conversation").unwrap();
        assert!(prefs_at < recall_at);
        assert!(text.ends_with("- [06-10 09:00] user: Weather in Tokyo?\n"));
    }

    #[test]
    fn reply_is_tagged() {
        let reply = ModelReply::Text("hello".into());
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["payload"], "hello");
    }
}
