//! Error types for the Concierge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each boundary (model API, tool adapters) has its own error enum.

use thiserror::Error;

/// The top-level error type for all Concierge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model API errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Preference store errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the hosted language model.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether an immediate second attempt could plausibly succeed.
    ///
    /// Network hiccups, timeouts and server-side (5xx) failures qualify.
    /// Authentication, rate limiting and malformed responses do not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// The uniform error set every tool adapter maps its failures into.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

impl ToolError {
    /// Map an upstream HTTP status to the uniform error set.
    ///
    /// Returns `None` for success codes.
    pub fn from_status(status: u16, context: impl Into<String>) -> Option<Self> {
        let context = context.into();
        match status {
            200..=299 => None,
            400 | 422 => Some(Self::InvalidParameters(context)),
            401 | 403 => Some(Self::Unauthorized(context)),
            404 => Some(Self::NotFound(context)),
            429 => Some(Self::RateLimited(context)),
            _ => Some(Self::Unavailable(format!("{context} (status {status})"))),
        }
    }

    /// Short machine-friendly label, used in logs and tool exchanges.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited(_) => "rate_limited",
            Self::Unavailable(_) => "unavailable",
            Self::InvalidParameters(_) => "invalid_parameters",
        }
    }
}

/// Failures reading or writing preference snapshots.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed snapshot: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn transient_provider_errors() {
        assert!(ProviderError::Network("reset".into()).is_transient());
        assert!(ProviderError::Timeout("30s".into()).is_transient());
        assert!(
            ProviderError::ApiError {
                status_code: 503,
                message: "overloaded".into()
            }
            .is_transient()
        );
        assert!(
            !ProviderError::ApiError {
                status_code: 400,
                message: "bad".into()
            }
            .is_transient()
        );
        assert!(!ProviderError::AuthenticationFailed("key".into()).is_transient());
        assert!(!ProviderError::RateLimited { retry_after_secs: 5 }.is_transient());
    }

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert_eq!(ToolError::from_status(200, "ok"), None);
        assert!(matches!(ToolError::from_status(401, "x"), Some(ToolError::Unauthorized(_))));
        assert!(matches!(ToolError::from_status(403, "x"), Some(ToolError::Unauthorized(_))));
        assert!(matches!(ToolError::from_status(404, "x"), Some(ToolError::NotFound(_))));
        assert!(matches!(ToolError::from_status(429, "x"), Some(ToolError::RateLimited(_))));
        assert!(matches!(ToolError::from_status(400, "x"), Some(ToolError::InvalidParameters(_))));
        assert!(matches!(ToolError::from_status(502, "x"), Some(ToolError::Unavailable(_))));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::Unauthorized("weather key rejected".into()));
        assert!(err.to_string().contains("Unauthorized"));
        assert!(err.to_string().contains("weather key"));
        assert_eq!(ToolError::RateLimited("x".into()).kind(), "rate_limited");
    }
}
