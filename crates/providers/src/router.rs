//! Provider selection from configuration.

use crate::gemini::{GEMINI_API_BASE, GeminiProvider};
use crate::openai_compat::OpenAiCompatProvider;
use concierge_config::AppConfig;
use concierge_core::error::ProviderError;
use concierge_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured provider.
///
/// Retries are not applied here; the conversation loop wraps whatever it
/// is given in [`RetryingProvider`](crate::retry::RetryingProvider).
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.provider.as_str();
    let overrides = config.providers.get(name);

    let api_key = overrides
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .filter(|k| !k.trim().is_empty());

    let base_url = overrides
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let timeout = Duration::from_secs(config.request_timeout_secs);

    let provider: Arc<dyn Provider> = match (name, api_key) {
        ("gemini", Some(key)) => Arc::new(GeminiProvider::new(key, timeout).with_base_url(base_url)),
        ("ollama", key) => Arc::new(OpenAiCompatProvider::new(
            name,
            base_url,
            key.unwrap_or_else(|| "ollama".into()),
            timeout,
        )),
        (_, Some(key)) => Arc::new(OpenAiCompatProvider::new(name, base_url, key, timeout)),
        (_, None) => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{name}' (set GEMINI_API_KEY or CONCIERGE_API_KEY)"
            )));
        }
    };

    Ok(provider)
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "gemini" => GEMINI_API_BASE.into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
