//! System prompt construction.

use chrono::{DateTime, Local};
use concierge_config::AssistantConfig;

/// The persona and rules sent with every model call.
///
/// A configured override replaces the built-in persona; the current time is
/// appended either way so relative dates resolve correctly.
pub fn system_prompt(assistant: &AssistantConfig, now: DateTime<Local>) -> String {
    let mut prompt = match &assistant.system_prompt_override {
        Some(custom) if !custom.trim().is_empty() => custom.trim().to_string(),
        _ => default_persona(&assistant.name),
    };
    prompt.push_str(&format!(
        "\n\nCurrent time: {} ({})",
        now.format("%Y-%m-%d %H:%M"),
        now.format("%A")
    ));
    prompt
}

fn default_persona(name: &str) -> String {
    format!(
        "You are {name}, a friendly and practical personal assistant.\n\
         \n\
         Capabilities:\n\
         - weather: current conditions for any city\n\
         - calendar: add, list and delete the user's events\n\
         - email: list, read, search and draft messages\n\
         \n\
         Rules:\n\
         - Call a tool only when the request needs live or stored data; answer everything else directly.\n\
         - Call at most one tool per reply.\n\
         - When the user reveals a lasting fact about themselves (home city, name, likes, dislikes), \
           call remember_preference with a short snake_case key.\n\
         - Use known preferences to fill in missing details, e.g. their city for a weather question.\n\
         - Reply in the user's language. Keep answers short and helpful."
    )
}
