//! LLM-backed scorer.
//!
//! One chat call per review. The user's prompt becomes the system message,
//! followed by a fixed output contract; the review itself goes in the user
//! message. The first failing review fails the batch.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use super::parse::parse_scoring_response;
use super::{MachineScores, ReviewScorer, ScoringError};
use crate::gateway::{
    ChatGateway, ChatRequest, FinishReason, GatewayConfig, Message, OpenRouterAdapter, ProviderError,
    RetryingGateway,
};
use crate::scoring::{Dimension, Review};
use crate::settings::{ScoringSettings, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

pub struct LlmScorer<G: ChatGateway + ?Sized> {
    gateway: Arc<G>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl<G: ChatGateway + ?Sized> LlmScorer<G> {
    pub fn new(gateway: Arc<G>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn score_one(&self, prompt: &str, review: &Review) -> Result<MachineScores, ScoringError> {
        let request = ChatRequest::new(
            self.model.clone(),
            vec![
                Message::system(system_message(prompt)),
                Message::user(user_message(review)),
            ],
        )
        .temperature(self.temperature)
        .max_tokens(self.max_tokens)
        .json();

        let response = self.gateway.chat(request).await?;
        parse_scoring_response(&review.id, &response.content).map_err(|e| {
            match (e, response.finish_reason) {
                (ScoringError::Parse { review_id, message }, Some(FinishReason::Length)) => {
                    ScoringError::Parse {
                        review_id,
                        message: format!("{message} (reply cut off at max_tokens)"),
                    }
                }
                (e, _) => e,
            }
        })
    }
}

impl LlmScorer<RetryingGateway<OpenRouterAdapter>> {
    /// OpenRouter-backed scorer configured from saved settings. Transport
    /// retries happen only when `settings.max_retries` asks for them.
    pub fn from_settings(settings: &ScoringSettings) -> Result<Self, ScoringError> {
        let model = settings
            .model_id()
            .map_err(|e| ProviderError::config(e.to_string()))?;
        let adapter = OpenRouterAdapter::from_settings(settings)?;
        let gateway = RetryingGateway::with_config(
            adapter,
            GatewayConfig {
                max_retries: settings.max_retries,
                ..GatewayConfig::default()
            },
        );
        Ok(Self::new(Arc::new(gateway), model)
            .temperature(settings.temperature)
            .max_tokens(settings.max_tokens))
    }
}

#[async_trait]
impl<G: ChatGateway + ?Sized> ReviewScorer for LlmScorer<G> {
    async fn score_batch(
        &self,
        prompt: &str,
        reviews: &[Review],
    ) -> Result<Vec<MachineScores>, ScoringError> {
        let start = Instant::now();
        let mut results = Vec::with_capacity(reviews.len());
        for review in reviews {
            match self.score_one(prompt, review).await {
                Ok(scored) => results.push(scored),
                Err(e) => {
                    warn!(
                        error = %e,
                        code = e.code(),
                        review_id = %review.id,
                        model = %self.model,
                        "scoring call failed; discarding batch"
                    );
                    return Err(e);
                }
            }
        }
        info!(
            reviews = results.len(),
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "llm scoring batch complete"
        );
        Ok(results)
    }
}

fn system_message(prompt: &str) -> String {
    let keys = Dimension::ALL
        .iter()
        .map(|d| format!("\"{}\"", d.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let glossary = Dimension::ALL
        .iter()
        .map(|d| format!("- {}: {}", d.as_str(), d.description()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{prompt}\n\n\
         Dimensions:\n{glossary}\n\n\
         Respond with a single JSON object and nothing else:\n\
         {{\"scores\": {{<dimension>: <integer from -3 to 3>}}, \
         \"justifications\": {{<dimension>: <one sentence>}}}}\n\
         Use exactly these dimension keys: {keys}."
    )
}

fn user_message(review: &Review) -> String {
    // JSON-escape the review so embedded quotes or braces can't break framing.
    let text = serde_json::to_string(&review.text).unwrap_or_else(|_| review.text.clone());
    format!("Star rating: {}/5\nReview: {text}", review.stars)
}
