//! OpenRouter chat-completions backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{HttpDetail, ProviderError};
use super::types::*;
use crate::settings::{ScoringSettings, DEFAULT_TIMEOUT_SECONDS};

/// One chat completion backend. Retries live in [`super::RetryingGateway`].
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECONDS);
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Bodies past this size are abandoned mid-stream.
const MAX_BODY_BYTES: usize = 1 << 20;

/// A review plus the scoring instructions never gets near this.
const MAX_PROMPT_CHARS: usize = 200_000;

const REFUSAL_OPENERS: &[&str] = &[
    "i cannot",
    "i can't",
    "i won't",
    "i'm unable to",
    "i am unable to",
    "i'm not able to",
    "sorry, i can't",
];

#[derive(Debug, Clone)]
pub struct OpenRouterAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl OpenRouterAdapter {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, None)
    }

    /// Builds an adapter from saved scoring settings. Fails when no API key is configured.
    pub fn from_settings(settings: &ScoringSettings) -> Result<Self, ProviderError> {
        let Some(api_key) = settings.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Err(ProviderError::config(
                "no API key configured (set UX_TRIAGE_API_KEY)",
            ));
        };

        Self::with_config(
            api_key,
            settings.base_url.as_str(),
            Duration::from_secs(settings.timeout_seconds),
            Some("ux-triage".to_string()),
        )
    }

    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        app_title: Option<String>,
    ) -> Result<Self, ProviderError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.into()))
            .map_err(|_| ProviderError::config("API key contains characters not allowed in a header"))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, bearer);
        if let Some(title) = app_title.and_then(|t| HeaderValue::from_str(&t).ok()) {
            headers.insert("X-Title", title);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::config(format!("cannot build HTTP client: {e}")))?;

        let endpoint = format!("{}/chat/completions", base_url.into().trim_end_matches('/'));
        Ok(Self { client, endpoint })
    }

    async fn read_capped(mut response: reqwest::Response) -> Result<String, ProviderError> {
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(ProviderError::upstream(
                    format!("response body exceeds {MAX_BODY_BYTES} bytes"),
                    false,
                ));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn looks_like_refusal(text: &str) -> bool {
    let opening = text
        .trim_start()
        .lines()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    REFUSAL_OPENERS.iter().any(|p| opening.starts_with(p))
}

fn header_str(headers: &HeaderMap, name: impl reqwest::header::AsHeaderName) -> Option<String> {
    headers.get(name)?.to_str().ok().map(str::to_owned)
}

/// Maps a non-2xx reply onto the error taxonomy: 429 waits, 5xx retries, everything else is final.
fn classify_failure(
    status: StatusCode,
    request_id: Option<String>,
    retry_after: Option<Duration>,
    body: &str,
) -> ProviderError {
    let envelope = serde_json::from_str::<WireResponse>(body)
        .ok()
        .and_then(|r| r.error);

    let detail = HttpDetail {
        status: Some(status.as_u16()),
        upstream_code: envelope.as_ref().and_then(|e| e.code.as_ref()).map(|c| match c {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        request_id,
    };

    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::RateLimited {
            retry_after: retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT),
            detail,
        };
    }

    let message = envelope
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    ProviderError::Upstream {
        message,
        retryable: status.is_server_error(),
        detail: Some(detail),
    }
}

fn decode_completion(body: &str, started: Instant) -> Result<ChatResponse, ProviderError> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::upstream(format!("malformed completion body: {e}"), false))?;

    if let Some(error) = wire.error {
        let message = error.message.unwrap_or_default();
        return Err(if looks_like_refusal(&message) {
            ProviderError::Refused(message)
        } else {
            ProviderError::upstream(message, false)
        });
    }

    let Some(choice) = wire.choices.into_iter().next() else {
        return Err(ProviderError::upstream("completion had no choices", false));
    };
    let content = choice.message.and_then(|m| m.content).unwrap_or_default();
    if looks_like_refusal(&content) {
        return Err(ProviderError::Refused(content));
    }

    let usage = wire.usage.unwrap_or_default();
    Ok(ChatResponse {
        content,
        input_tokens: usage.prompt_tokens.unwrap_or(0),
        output_tokens: usage.completion_tokens.unwrap_or(0),
        latency: started.elapsed(),
        finish_reason: FinishReason::parse(choice.finish_reason.as_deref()),
    })
}

#[async_trait]
impl ChatProvider for OpenRouterAdapter {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let prompt_chars: usize = req.messages.iter().map(|m| m.content.chars().count()).sum();
        if prompt_chars > MAX_PROMPT_CHARS {
            return Err(ProviderError::Rejected(format!(
                "prompt is {prompt_chars} chars, limit is {MAX_PROMPT_CHARS}"
            )));
        }

        let wire = WireRequest {
            model: &req.model,
            messages: req
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            response_format: req.json_mode.then_some(WireFormat { kind: "json_object" }),
        };

        let started = Instant::now();
        let response = self.client.post(&self.endpoint).json(&wire).send().await?;

        let status = response.status();
        let request_id = header_str(response.headers(), "x-request-id");
        let retry_after = header_str(response.headers(), RETRY_AFTER)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = Self::read_capped(response).await?;

        debug!(
            model = %req.model,
            status = status.as_u16(),
            bytes = body.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "chat completion returned"
        );

        if !status.is_success() {
            return Err(classify_failure(status, request_id, retry_after, &body));
        }
        decode_completion(&body, started)
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireFormat>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: Option<WireChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct WireError {
    message: Option<String>,
    code: Option<serde_json::Value>,
}
