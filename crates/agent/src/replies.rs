//! Fixed user-facing wording for the paths that bypass the model.

use concierge_core::error::{ProviderError, ToolError};
use concierge_core::preference::PreferenceUpdate;

pub const USAGE_HINT: &str =
    "Tell me what you need: ask about the weather, your calendar or your email, or just chat.";

pub const EMPTY_REPLY: &str = "Sorry, I don't have an answer for that. Could you rephrase?";

/// One apology per tool failure kind.
pub fn tool_apology(error: &ToolError) -> &'static str {
    match error {
        ToolError::NotFound(_) => {
            "Sorry, I couldn't find that. Please check the name or id and try again."
        }
        ToolError::Unauthorized(_) => {
            "Sorry, I'm not authorized to use that service right now. Please check its API key."
        }
        ToolError::RateLimited(_) => {
            "Sorry, that service is getting too many requests right now. Please try again in a moment."
        }
        ToolError::Unavailable(_) => "Sorry, that service is unavailable right now. Please try again later.",
        ToolError::InvalidParameters(_) => {
            "Sorry, I couldn't work out the details of that request. Could you rephrase it?"
        }
    }
}

/// Shown when the model could not be reached, even after a retry.
pub fn degraded(error: &ProviderError) -> &'static str {
    match error {
        ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_) => {
            "I can't reach my language service because it isn't configured correctly. Please check the API key."
        }
        ProviderError::RateLimited { .. } => {
            "My language service is busy right now. Please try again in a moment."
        }
        _ => "Sorry, I'm having trouble reaching my language service right now. Please try again shortly.",
    }
}

/// Reply for a model turn that only flagged preferences.
pub fn acknowledge(updates: &[PreferenceUpdate]) -> String {
    let facts: Vec<String> = updates.iter().map(|u| format!("{}: {}", u.key, u.value)).collect();
    format!("Noted, I'll remember that {}.", facts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_error_kind_has_distinct_wording() {
        let errors = [
            ToolError::NotFound("x".into()),
            ToolError::Unauthorized("x".into()),
            ToolError::RateLimited("x".into()),
            ToolError::Unavailable("x".into()),
            ToolError::InvalidParameters("x".into()),
        ];
        let mut wordings: Vec<_> = errors.iter().map(tool_apology).collect();
        wordings.sort();
        wordings.dedup();
        assert_eq!(wordings.len(), errors.len());
    }

    #[test]
    fn apology_hides_upstream_detail() {
        let text = tool_apology(&ToolError::Unauthorized("key sk-123 rejected".into()));
        assert!(!text.contains("sk-123"));
    }

    #[test]
    fn acknowledgement_lists_facts() {
        let updates = vec![
            PreferenceUpdate::new("city", "Taipei").unwrap(),
            PreferenceUpdate::new("likes", "coffee").unwrap(),
        ];
        assert_eq!(acknowledge(&updates), "Noted, I'll remember that city: Taipei, likes: coffee.");
    }
}
