//! Bulk review import.
//!
//! Imports drop invalid records and report how many were dropped; only a
//! payload with no usable record at all is rejected outright.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::SessionError;
use crate::scoring::{Review, STARS_MAX, STARS_MIN};

const MISSING_ID: &str = "missing `id` (a `name` field is read as the author, not as an id)";

/// Accepts both the upload field names and the export field names.
#[derive(Debug, Deserialize)]
struct ReviewRecord {
    #[serde(alias = "review_id")]
    id: String,
    #[serde(alias = "review_text")]
    text: String,
    #[serde(alias = "star_rating")]
    stars: i64,
    #[serde(default, alias = "name")]
    author: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// A record dropped from an import, with its position in the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub reviews: Vec<Review>,
    pub rejected: Vec<RejectedRecord>,
}

impl ImportOutcome {
    pub fn accepted_count(&self) -> usize {
        self.reviews.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Parses a JSON array of reviews, or a single review object.
pub fn parse_reviews(raw: &str) -> Result<ImportOutcome, SessionError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| SessionError::validation(format!("review payload is not valid JSON: {e}")))?;

    let records = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(SessionError::validation(format!(
                "review payload must be an array or an object, got {}",
                json_kind(&other)
            )))
        }
    };

    let outcome = sort_records(records);
    if outcome.reviews.is_empty() {
        let hint = if outcome.rejected.iter().any(|r| r.reason == MISSING_ID) {
            "; add a unique `id` (or `review_id`) to every record"
        } else {
            ""
        };
        return Err(SessionError::validation(format!(
            "no valid reviews found ({} rejected); each review needs an id, text, and stars{hint}",
            outcome.rejected_count()
        )));
    }

    if outcome.rejected_count() > 0 {
        warn!(
            accepted = outcome.accepted_count(),
            rejected = outcome.rejected_count(),
            "dropped invalid review records"
        );
    }
    info!(accepted = outcome.accepted_count(), "parsed review import");
    Ok(outcome)
}

fn sort_records(records: Vec<Value>) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    let mut seen = HashSet::new();

    for (position, record) in records.into_iter().enumerate() {
        match to_review(record) {
            Ok(review) if !seen.insert(review.id.clone()) => {
                outcome.rejected.push(RejectedRecord {
                    position,
                    reason: format!("duplicate review id: {}", review.id),
                });
            }
            Ok(review) => outcome.reviews.push(review),
            Err(reason) => outcome.rejected.push(RejectedRecord { position, reason }),
        }
    }
    outcome
}

fn to_review(record: Value) -> Result<Review, String> {
    if record.get("id").is_none() && record.get("review_id").is_none() {
        return Err(MISSING_ID.to_string());
    }
    let record: ReviewRecord = serde_json::from_value(record).map_err(|e| e.to_string())?;
    let stars = u8::try_from(record.stars)
        .ok()
        .filter(|s| (STARS_MIN..=STARS_MAX).contains(s))
        .ok_or_else(|| {
            format!(
                "star rating {} outside [{STARS_MIN}, {STARS_MAX}]",
                record.stars
            )
        })?;

    let review = Review {
        id: record.id,
        text: record.text,
        stars,
        author: record.author,
        date: record.date,
    };
    review.validate().map_err(|e| e.to_string())?;
    Ok(review)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_object() {
        let outcome = parse_reviews(r#"{"id": "r1", "text": "Great", "stars": 5}"#).unwrap();
        assert_eq!(outcome.accepted_count(), 1);
        assert_eq!(outcome.reviews[0].id, "r1");
    }

    #[test]
    fn accepts_export_field_names() {
        let raw = r#"[{"review_id": "r9", "review_text": "Slow", "star_rating": 2, "name": "Ana"}]"#;
        let outcome = parse_reviews(raw).unwrap();
        assert_eq!(outcome.reviews[0].id, "r9");
        assert_eq!(outcome.reviews[0].author.as_deref(), Some("Ana"));
    }

    #[test]
    fn drops_and_reports_bad_records() {
        let raw = r#"[
            {"id": "a", "text": "ok", "stars": 4},
            {"id": "b", "text": "fractional", "stars": 4.5},
            {"id": "c", "text": "too many", "stars": 6},
            {"id": "a", "text": "dupe", "stars": 1},
            {"text": "no id", "stars": 3}
        ]"#;
        let outcome = parse_reviews(raw).unwrap();
        assert_eq!(outcome.accepted_count(), 1);
        assert_eq!(outcome.rejected_count(), 4);
        let positions: Vec<usize> = outcome.rejected.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn rejects_payload_without_valid_records() {
        let err = parse_reviews(r#"[{"text": "x"}]"#).unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[test]
    fn records_without_id_point_at_the_missing_field() {
        let raw = r#"[{"name": "Ana", "date": "2024-01-01", "text": "Great", "stars": 5}]"#;
        let err = parse_reviews(raw).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("1 rejected"), "{message}");
        assert!(message.contains("`id`"), "{message}");

        let mixed = r#"[
            {"name": "Ana", "text": "Great", "stars": 5},
            {"id": "r2", "name": "Bo", "text": "Meh", "stars": 3}
        ]"#;
        let outcome = parse_reviews(mixed).unwrap();
        assert_eq!(outcome.rejected[0].reason, MISSING_ID);
        assert_eq!(outcome.reviews[0].author.as_deref(), Some("Bo"));
    }

    #[test]
    fn rejects_malformed_json_and_scalars() {
        assert!(matches!(parse_reviews("[{"), Err(SessionError::Validation(_))));
        assert!(matches!(parse_reviews("42"), Err(SessionError::Validation(_))));
    }
}
