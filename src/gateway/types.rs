//! Request and response shapes shared by every chat backend.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }
}

/// One completion call. Built with chained setters:
/// `ChatRequest::new(model, messages).temperature(0.7).json()`.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Routed model id, e.g. "openai/gpt-4".
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the backend to constrain output to a JSON object.
    pub json_mode: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.0,
            max_tokens: None,
            json_mode: false,
        }
    }

    pub fn temperature(self, temperature: f32) -> Self {
        Self { temperature, ..self }
    }

    pub fn max_tokens(self, limit: u32) -> Self {
        Self {
            max_tokens: Some(limit),
            ..self
        }
    }

    pub fn json(self) -> Self {
        Self {
            json_mode: true,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Output hit `max_tokens`; the content is probably truncated.
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// `None` when the backend omitted the field.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        Some(match raw? {
            "stop" | "end_turn" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_owned()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency: Duration,
    pub finish_reason: Option<FinishReason>,
}

impl ChatResponse {
    /// A finished reply with no usage accounting, for in-process gateways.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            input_tokens: 0,
            output_tokens: 0,
            latency: Duration::ZERO,
            finish_reason: Some(FinishReason::Stop),
        }
    }
}
