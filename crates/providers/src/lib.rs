//! Language-model backends for Concierge.
//!
//! All providers implement the `concierge_core::Provider` trait.
//! [`router::build_from_config`] picks one from configuration;
//! [`RetryingProvider`] adds the single-retry policy on top.

pub mod gemini;
pub mod openai_compat;
mod reply;
pub mod retry;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryingProvider;
pub use router::build_from_config;
