//! Parsing of model responses into score sets.
//!
//! Expected shape (surrounding prose and code fences are tolerated):
//!
//! ```json
//! {"scores": {"attractiveness": 2, ...}, "justifications": {"attractiveness": "...", ...}}
//! ```
//!
//! `llm_scores` / `llm_justification` are accepted as aliases, matching the
//! export document. Every dimension must be scored; justifications may be
//! missing. Out-of-range numbers are clamped here so nothing past this point
//! ever sees one.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::{MachineScores, ScoringError};
use crate::scoring::{Dimension, JustificationSet, Score, ScoreSet};

#[derive(Debug, Deserialize)]
struct ScoringResponseJson {
    #[serde(alias = "llm_scores")]
    scores: Option<Map<String, Value>>,
    #[serde(default, alias = "llm_justification")]
    justifications: Option<Map<String, Value>>,
}

pub fn parse_scoring_response(review_id: &str, raw: &str) -> Result<MachineScores, ScoringError> {
    let json_str = extract_json(raw);
    let parsed: ScoringResponseJson = serde_json::from_str(json_str)
        .map_err(|e| ScoringError::parse(review_id, e.to_string()))?;

    let raw_scores = parsed
        .scores
        .ok_or_else(|| ScoringError::parse(review_id, "missing 'scores'"))?;

    let mut scores = ScoreSet::zeroed();
    for dimension in Dimension::ALL {
        let value = raw_scores
            .get(dimension.as_str())
            .ok_or_else(|| {
                ScoringError::parse(review_id, format!("missing score for {dimension}"))
            })?;
        scores.set(dimension, to_score(review_id, dimension, value)?);
    }

    let raw_justifications = parsed.justifications.unwrap_or_default();
    let justifications = JustificationSet::from_fn(|d| {
        match raw_justifications.get(d.as_str()) {
            Some(Value::String(s)) => s.trim().to_string(),
            _ => String::new(),
        }
    });

    Ok(MachineScores::new(review_id, scores, justifications))
}

fn to_score(review_id: &str, dimension: Dimension, value: &Value) -> Result<Score, ScoringError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        // Some models quote their numbers ("+2").
        Value::String(s) => s.trim().trim_start_matches('+').parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
    .ok_or_else(|| {
        ScoringError::parse(review_id, format!("score for {dimension} is not a number: {value}"))
    })?;

    let rounded = number.round() as i64;
    let score = Score::clamped(rounded);
    if number != f64::from(score.value()) {
        warn!(
            review_id,
            dimension = dimension.as_str(),
            raw = number,
            clamped = score.value(),
            "model score adjusted into range"
        );
    }
    Ok(score)
}

/// Extract a JSON object from a response that may contain surrounding text.
pub(crate) fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find('{') else {
        return trimmed;
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in trimmed[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &trimmed[start..start + i + 1];
                }
            }
            _ => {}
        }
    }
    &trimmed[start..]
}
