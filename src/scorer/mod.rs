//! Scoring collaborators.
//!
//! A [`ReviewScorer`] turns a prompt plus a batch of reviews into one
//! [`MachineScores`] per review. Implementations either return the whole
//! batch or an error; the session never applies a partial batch.

pub mod llm;
pub mod parse;
pub mod random;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::ProviderError;
use crate::scoring::{JustificationSet, Review, ScoreSet};

pub use llm::LlmScorer;
pub use random::RandomScorer;

/// Scorer output for a single review. Scores are already in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineScores {
    pub review_id: String,
    pub scores: ScoreSet,
    pub justifications: JustificationSet,
}

impl MachineScores {
    pub fn new(
        review_id: impl Into<String>,
        scores: ScoreSet,
        justifications: JustificationSet,
    ) -> Self {
        Self {
            review_id: review_id.into(),
            scores,
            justifications,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("could not parse scores for review {review_id}: {message}")]
    Parse { review_id: String, message: String },

    #[error("scorer returned {received} results for {expected} reviews")]
    Incomplete { expected: usize, received: usize },

    #[error("scorer returned a result for unknown review {0}")]
    UnknownReview(String),
}

impl ScoringError {
    pub fn parse(review_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            review_id: review_id.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Provider(e) => e.code(),
            Self::Parse { .. } => "parse_error",
            Self::Incomplete { .. } => "incomplete_batch",
            Self::UnknownReview(_) => "unknown_review",
        }
    }
}

#[async_trait]
pub trait ReviewScorer: Send + Sync {
    /// Scores every review in `reviews` under `prompt`.
    async fn score_batch(
        &self,
        prompt: &str,
        reviews: &[Review],
    ) -> Result<Vec<MachineScores>, ScoringError>;
}
