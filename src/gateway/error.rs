//! Failures from a single chat completion call.

use std::time::Duration;
use thiserror::Error;

/// What the upstream HTTP exchange told us about a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpDetail {
    pub status: Option<u16>,
    /// Machine-readable code from the error body, e.g. "rate_limit_exceeded".
    pub upstream_code: Option<String>,
    /// Value of the `x-request-id` response header.
    pub request_id: Option<String>,
}

impl HttpDetail {
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limited by upstream; retry after {}s", retry_after.as_secs())]
    RateLimited {
        retry_after: Duration,
        detail: HttpDetail,
    },

    /// The request itself is unusable and resending it cannot help.
    #[error("request rejected before sending: {0}")]
    Rejected(String),

    #[error("model declined to answer: {0}")]
    Refused(String),

    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        retryable: bool,
        detail: Option<HttpDetail>,
    },

    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway misconfigured: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn upstream(message: impl Into<String>, retryable: bool) -> Self {
        Self::Upstream {
            message: message.into(),
            retryable,
            detail: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Upstream { retryable, .. } => *retryable,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Rejected(_) | Self::Refused(_) | Self::Config(_) => false,
        }
    }

    /// Minimum wait the upstream asked for before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Rejected(_) => "rejected",
            Self::Refused(_) => "refused",
            Self::Upstream { .. } => "upstream_error",
            Self::Http(_) => "http_error",
            Self::Config(_) => "config_error",
        }
    }

    pub fn detail(&self) -> Option<&HttpDetail> {
        match self {
            Self::RateLimited { detail, .. } => Some(detail),
            Self::Upstream { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.detail().and_then(|d| d.request_id.as_deref())
    }
}
