//! # Concierge Core
//!
//! Domain types, traits, and error definitions for the Concierge assistant.
//! Every other crate depends inward on this one:
//!
//! - [`turn`]: the append-only conversation log (`Turn`, `Session`)
//! - [`provider`]: the language-model boundary (`Provider`, `ModelRequest`, `ModelReply`)
//! - [`tool`]: the closed set of tool requests the model may issue
//! - [`preference`]: remembered per-user facts

pub mod error;
pub mod preference;
pub mod provider;
pub mod tool;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, ToolError};
pub use preference::{PreferenceUpdate, Preferences};
pub use provider::{ModelReply, ModelRequest, ModelResponse, Provider, ToolDefinition, ToolExchange};
pub use tool::{ToolCall, ToolKind, ToolRequest, ToolResult};
pub use turn::{Session, SessionId, Speaker, Turn};
