//! Single-retry wrapper with a per-attempt timeout.
//!
//! A transient failure (network, timeout, 5xx) gets exactly one immediate
//! re-attempt. Everything else is returned as-is.

use async_trait::async_trait;
use concierge_core::error::ProviderError;
use concierge_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Added on top of the HTTP client's own timeout so the client reports its
/// timeout before the outer bound cuts the attempt off.
pub const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(2);

pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    timeout: Duration,
}

impl RetryingProvider {
    /// Bound every attempt by exactly `timeout`.
    pub fn new(inner: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Wrap a provider whose HTTP client already times out after `client_timeout`.
    pub fn for_client_timeout(inner: Arc<dyn Provider>, client_timeout: Duration) -> Self {
        Self::new(inner, client_timeout + CLIENT_TIMEOUT_GRACE)
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' timed out after {}s",
                self.inner.name(),
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        match self.attempt(request.clone()).await {
            Err(e) if e.is_transient() => {
                warn!(provider = %self.inner.name(), error = %e, "Transient provider failure, retrying once");
                self.attempt(request).await
            }
            other => other,
        }
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}
