//! Errors surfaced by session operations.
//!
//! Every variant is reported to the caller of the operation that caused it;
//! none leaves the evaluation store partially mutated.

use thiserror::Error;

use crate::history::HistoryStoreError;
use crate::scorer::ScoringError;
use crate::scoring::ScoreOutOfRange;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed or incomplete input (reviews, prompts, imported documents).
    #[error("validation error: {0}")]
    Validation(String),

    /// A score outside [-3, 3] reached a mutation boundary.
    #[error("range error: {0}")]
    Range(#[from] ScoreOutOfRange),

    /// No evaluation (or history entry) with the given key.
    #[error("not found: {0}")]
    NotFound(String),

    /// The scoring collaborator failed; the store was left untouched.
    #[error("scoring call failed: {0}")]
    Scoring(#[from] ScoringError),

    /// A second scoring call was issued while one is outstanding.
    #[error("a scoring call is already in flight")]
    ScoringInFlight,

    #[error("history store error: {0}")]
    History(#[from] HistoryStoreError),
}

impl SessionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    /// Short error code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Range(_) => "range",
            Self::NotFound(_) => "not_found",
            Self::Scoring(_) => "scoring_call",
            Self::ScoringInFlight => "scoring_in_flight",
            Self::History(_) => "history_store",
        }
    }
}
