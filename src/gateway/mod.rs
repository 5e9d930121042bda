//! Chat gateway used by the LLM scorer.
//!
//! [`ChatGateway`] is the seam the scorer depends on; [`RetryingGateway`]
//! wraps a [`ChatProvider`] with bounded exponential backoff.

pub mod error;
pub mod openrouter;
pub mod types;

use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

pub use error::{HttpDetail, ProviderError};
pub use openrouter::{ChatProvider, OpenRouterAdapter};
pub use types::*;

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Retries are opt-in: the default surfaces the first failure.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

pub struct RetryingGateway<P: ChatProvider> {
    provider: P,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl<P: ChatProvider> ChatGateway for RetryingGateway<P> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        RetryingGateway::chat(self, req).await
    }
}

impl<P: ChatProvider> RetryingGateway<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, GatewayConfig::default())
    }

    pub fn with_config(provider: P, config: GatewayConfig) -> Self {
        Self { provider, config }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.provider.chat(&req).await {
                Ok(resp) => return Ok(resp),
                Err(err) if !err.is_retryable() || attempt >= self.config.max_retries => {
                    return Err(err)
                }
                Err(err) => {
                    let backoff = backoff_delay(self.config.retry_base_delay, attempt);
                    let delay = err.retry_after().map_or(backoff, |wait| wait.max(backoff));
                    warn!(
                        error = %err,
                        code = err.code(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "chat call failed; retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let multiplier = 2u32.pow(attempt.min(5));
    base * multiplier
}
