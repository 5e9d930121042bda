#![forbid(unsafe_code)]

//! # ux-triage-harness
//!
//! Prompt iteration for LLM-scored app-store reviews.
//!
//! A prompt instructs a model to rate each review on six UX dimensions
//! (attractiveness, efficiency, perspicuity, dependability, stimulation,
//! novelty) using integer scores in [-3, 3]. A human rates the same reviews by
//! hand. The harness pairs both score sets per review, reduces every pair to an
//! agreement value in [0, 1], rolls those up into overall and per-dimension
//! summaries, and snapshots each prompt revision's results into a history
//! ledger so revisions can be compared over time.
//!
//! The scoring call is an asynchronous collaborator behind [`ReviewScorer`]:
//! [`RandomScorer`] simulates it, [`LlmScorer`] calls a chat-completions API.

pub mod aggregate;
pub mod alignment;
pub mod error;
pub mod export;
pub mod gateway;
pub mod history;
pub mod import;
pub mod report;
pub mod scorer;
pub mod scoring;
pub mod session;
pub mod settings;
pub mod store;

pub use aggregate::{aggregate, most_misaligned, rank_by_misalignment, AggregateResult};
pub use alignment::{align, alignment, overall_alignment, AlignmentBand};
pub use error::SessionError;
pub use export::{parse_export, ExportRecord, EXPORT_SCHEMA_VERSION};
pub use gateway::{ChatGateway, GatewayConfig, RetryingGateway};
pub use history::{HistoryEntry, HistoryLedger, SqliteHistoryStore};
pub use import::{parse_reviews, ImportOutcome};
pub use report::{build_report, render_analysis_markdown, render_report_markdown, AnalysisReport};
pub use scorer::{LlmScorer, MachineScores, RandomScorer, ReviewScorer, ScoringError};
pub use scoring::{
    AlignmentSet, Dimension, DimensionAlignments, JustificationSet, Review, Score, ScoreSet,
};
pub use session::{Analysis, Session, ScoringTicket};
pub use settings::{ModelChoice, ScoringSettings, SettingsError};
pub use store::{Direction, Evaluation, EvaluationStore, RecomputeTarget};
