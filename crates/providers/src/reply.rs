//! Shared reply assembly for every backend.

use concierge_core::preference::{PreferenceUpdate, REMEMBER_PREFERENCE};
use concierge_core::provider::ModelReply;
use concierge_core::tool::ToolCall;
use tracing::{debug, warn};

/// Fold the text and function calls of one model turn into a reply.
///
/// `remember_preference` calls become preference updates. The first
/// remaining call wins over any text; further calls are dropped.
pub(crate) fn assemble(text: String, calls: Vec<ToolCall>) -> (ModelReply, Vec<PreferenceUpdate>) {
    let mut preferences = Vec::new();
    let mut tool_calls = Vec::new();

    for call in calls {
        if call.name == REMEMBER_PREFERENCE {
            match PreferenceUpdate::from_arguments(&call.arguments) {
                Some(update) => preferences.push(update),
                None => debug!(arguments = %call.arguments, "Ignoring malformed preference call"),
            }
        } else {
            tool_calls.push(call);
        }
    }

    let mut tool_calls = tool_calls.into_iter();
    let reply = match tool_calls.next() {
        Some(first) => {
            let dropped: Vec<String> = tool_calls.map(|c| c.name).collect();
            if !dropped.is_empty() {
                warn!(kept = %first.name, ?dropped, "Model requested several tools, dispatching only the first");
            }
            ModelReply::ToolCall(first)
        }
        None => ModelReply::Text(text),
    };

    (reply, preferences)
}
