//! The conversation loop, the heart of Concierge.
//!
//! Each user utterance runs through one pass:
//!
//! 1. **Append** the user turn to the session
//! 2. **Call the model** with the windowed history and the user's preferences
//! 3. **Remember** any preference the model flagged
//! 4. **If a tool call**: dispatch it once, then ask the model to phrase the
//!    result with tool calling disabled
//! 5. **Append** the assistant turn and hand the text back to the front end
//!
//! Failures never escape: they become an apology turn and the session stays
//! usable.

pub mod conversation;
pub mod prompt;
pub mod replies;

pub use conversation::ConversationLoop;
