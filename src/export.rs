//! Export document: one flat record per evaluation.
//!
//! Field names are stable. Each record carries `schema_version`; readers
//! reject versions they don't know instead of guessing.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::scoring::{AlignmentSet, DimensionAlignments, JustificationSet, Review, ScoreSet};
use crate::store::Evaluation;

pub const EXPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub schema_version: u32,
    pub review_id: String,
    pub review_text: String,
    pub star_rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub llm_scores: ScoreSet,
    #[serde(default)]
    pub llm_justification: JustificationSet,
    pub human_scores: ScoreSet,
    pub overall_alignment_score: f64,
    pub dimension_alignments: DimensionAlignments,
}

impl ExportRecord {
    pub fn from_evaluation(evaluation: &Evaluation) -> Self {
        let review = evaluation.review();
        let alignment = evaluation.alignment();
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            review_id: review.id.clone(),
            review_text: review.text.clone(),
            star_rating: review.stars,
            author: review.author.clone(),
            date: review.date.clone(),
            llm_scores: *evaluation.machine(),
            llm_justification: evaluation.justifications().clone(),
            human_scores: *evaluation.human(),
            overall_alignment_score: alignment.overall,
            dimension_alignments: alignment.dimensions,
        }
    }

    pub fn alignment(&self) -> AlignmentSet {
        AlignmentSet {
            overall: self.overall_alignment_score,
            dimensions: self.dimension_alignments,
        }
    }

    /// Rebuilds the evaluation. Alignment is re-derived from the two score sets.
    pub fn into_evaluation(self) -> Evaluation {
        let review = Review {
            id: self.review_id,
            text: self.review_text,
            stars: self.star_rating,
            author: self.author,
            date: self.date,
        };
        Evaluation::with_scores(review, self.human_scores, self.llm_scores, self.llm_justification)
    }
}

pub fn export_records(evaluations: &[Evaluation]) -> Vec<ExportRecord> {
    evaluations.iter().map(ExportRecord::from_evaluation).collect()
}

pub fn to_json(records: &[ExportRecord]) -> Result<String, SessionError> {
    serde_json::to_string_pretty(records)
        .map_err(|e| SessionError::validation(format!("export serialization failed: {e}")))
}

/// Parses an export document. Scores outside [-3, 3] fail deserialization.
pub fn parse_export(raw: &str) -> Result<Vec<ExportRecord>, SessionError> {
    let records: Vec<ExportRecord> = serde_json::from_str(raw)
        .map_err(|e| SessionError::validation(format!("invalid export document: {e}")))?;

    if let Some(record) = records
        .iter()
        .find(|r| r.schema_version != EXPORT_SCHEMA_VERSION)
    {
        return Err(SessionError::validation(format!(
            "unsupported export schema version {} on review {} (expected {EXPORT_SCHEMA_VERSION})",
            record.schema_version, record.review_id
        )));
    }
    Ok(records)
}
