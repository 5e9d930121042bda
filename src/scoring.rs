//! Scoring vocabulary shared by every other module.
//!
//! Defines the closed set of UX dimensions, the bounded [`Score`], and the
//! per-review record shapes. Every per-dimension record has exactly one field
//! per dimension, declared (and serialized) in [`Dimension::ALL`] order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

// =============================================================================
// Constants
// =============================================================================

/// Lowest score a rater can give a dimension.
pub const SCORE_MIN: i8 = -3;
/// Highest score a rater can give a dimension.
pub const SCORE_MAX: i8 = 3;

/// Star-rating bounds of an imported review.
pub const STARS_MIN: u8 = 1;
pub const STARS_MAX: u8 = 5;

// =============================================================================
// Dimension
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Attractiveness,
    Efficiency,
    Perspicuity,
    Dependability,
    Stimulation,
    Novelty,
}

impl Dimension {
    /// All dimensions in declaration order. Tie-breaks follow this order.
    pub const ALL: [Dimension; 6] = [
        Dimension::Attractiveness,
        Dimension::Efficiency,
        Dimension::Perspicuity,
        Dimension::Dependability,
        Dimension::Stimulation,
        Dimension::Novelty,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Attractiveness => "attractiveness",
            Dimension::Efficiency => "efficiency",
            Dimension::Perspicuity => "perspicuity",
            Dimension::Dependability => "dependability",
            Dimension::Stimulation => "stimulation",
            Dimension::Novelty => "novelty",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Attractiveness => "Attractiveness",
            Dimension::Efficiency => "Efficiency",
            Dimension::Perspicuity => "Perspicuity",
            Dimension::Dependability => "Dependability",
            Dimension::Stimulation => "Stimulation",
            Dimension::Novelty => "Novelty",
        }
    }

    /// One-line description used when instructing a model.
    pub fn description(self) -> &'static str {
        match self {
            Dimension::Attractiveness => "overall impression; does the user like the product",
            Dimension::Efficiency => "can tasks be done quickly and without unnecessary effort",
            Dimension::Perspicuity => "is the product easy to understand and learn",
            Dimension::Dependability => "does the user feel in control; is it reliable",
            Dimension::Stimulation => "is the product exciting and motivating to use",
            Dimension::Novelty => "is the product innovative and creative",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| SessionError::validation(format!("unknown dimension: {s}")))
    }
}

// =============================================================================
// Score
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("score {value} is outside [{min}, {max}]", min = SCORE_MIN, max = SCORE_MAX)]
pub struct ScoreOutOfRange {
    pub value: i64,
}

/// Integer sentiment strength in [-3, 3]; 0 is neutral.
///
/// The only constructors are range-checked, so a `Score` value is always
/// in range.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i8")]
pub struct Score(i8);

impl Score {
    pub const MIN: Score = Score(SCORE_MIN);
    pub const MAX: Score = Score(SCORE_MAX);
    pub const NEUTRAL: Score = Score(0);

    pub fn new(value: i64) -> Result<Self, ScoreOutOfRange> {
        if (i64::from(SCORE_MIN)..=i64::from(SCORE_MAX)).contains(&value) {
            Ok(Score(value as i8))
        } else {
            Err(ScoreOutOfRange { value })
        }
    }

    /// Saturates into range. Only for collaborator boundaries that must not reject.
    pub fn clamped(value: i64) -> Self {
        Score(value.clamp(i64::from(SCORE_MIN), i64::from(SCORE_MAX)) as i8)
    }

    pub fn value(self) -> i8 {
        self.0
    }

    /// Every valid score, lowest first.
    pub fn all() -> impl Iterator<Item = Score> {
        (SCORE_MIN..=SCORE_MAX).map(Score)
    }
}

impl TryFrom<i64> for Score {
    type Error = ScoreOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Score::new(value)
    }
}

impl From<Score> for i8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

// =============================================================================
// Review
// =============================================================================

/// An externally supplied review. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub text: String,
    pub stars: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Review {
    pub fn new(id: impl Into<String>, text: impl Into<String>, stars: u8) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            stars,
            author: None,
            date: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Rejects a blank id or a star rating outside [1, 5]. Never clamps.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.id.trim().is_empty() {
            return Err(SessionError::validation("review id must not be empty"));
        }
        if !(STARS_MIN..=STARS_MAX).contains(&self.stars) {
            return Err(SessionError::validation(format!(
                "review {}: star rating {} outside [{STARS_MIN}, {STARS_MAX}]",
                self.id, self.stars
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Per-dimension records
// =============================================================================

/// One score per dimension. Created zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreSet {
    pub attractiveness: Score,
    pub efficiency: Score,
    pub perspicuity: Score,
    pub dependability: Score,
    pub stimulation: Score,
    pub novelty: Score,
}

impl ScoreSet {
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Same score on every dimension.
    pub fn uniform(score: Score) -> Self {
        Self::from_fn(|_| score)
    }

    pub fn from_fn(mut f: impl FnMut(Dimension) -> Score) -> Self {
        Self {
            attractiveness: f(Dimension::Attractiveness),
            efficiency: f(Dimension::Efficiency),
            perspicuity: f(Dimension::Perspicuity),
            dependability: f(Dimension::Dependability),
            stimulation: f(Dimension::Stimulation),
            novelty: f(Dimension::Novelty),
        }
    }

    pub fn get(&self, dimension: Dimension) -> Score {
        match dimension {
            Dimension::Attractiveness => self.attractiveness,
            Dimension::Efficiency => self.efficiency,
            Dimension::Perspicuity => self.perspicuity,
            Dimension::Dependability => self.dependability,
            Dimension::Stimulation => self.stimulation,
            Dimension::Novelty => self.novelty,
        }
    }

    pub fn set(&mut self, dimension: Dimension, score: Score) {
        let slot = match dimension {
            Dimension::Attractiveness => &mut self.attractiveness,
            Dimension::Efficiency => &mut self.efficiency,
            Dimension::Perspicuity => &mut self.perspicuity,
            Dimension::Dependability => &mut self.dependability,
            Dimension::Stimulation => &mut self.stimulation,
            Dimension::Novelty => &mut self.novelty,
        };
        *slot = score;
    }

    pub fn with(mut self, dimension: Dimension, score: Score) -> Self {
        self.set(dimension, score);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, Score)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

/// Free-text reasons for the machine score set; empty by default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JustificationSet {
    pub attractiveness: String,
    pub efficiency: String,
    pub perspicuity: String,
    pub dependability: String,
    pub stimulation: String,
    pub novelty: String,
}

impl JustificationSet {
    pub fn from_fn(mut f: impl FnMut(Dimension) -> String) -> Self {
        Self {
            attractiveness: f(Dimension::Attractiveness),
            efficiency: f(Dimension::Efficiency),
            perspicuity: f(Dimension::Perspicuity),
            dependability: f(Dimension::Dependability),
            stimulation: f(Dimension::Stimulation),
            novelty: f(Dimension::Novelty),
        }
    }

    pub fn get(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Attractiveness => &self.attractiveness,
            Dimension::Efficiency => &self.efficiency,
            Dimension::Perspicuity => &self.perspicuity,
            Dimension::Dependability => &self.dependability,
            Dimension::Stimulation => &self.stimulation,
            Dimension::Novelty => &self.novelty,
        }
    }

    pub fn set(&mut self, dimension: Dimension, text: impl Into<String>) {
        let slot = match dimension {
            Dimension::Attractiveness => &mut self.attractiveness,
            Dimension::Efficiency => &mut self.efficiency,
            Dimension::Perspicuity => &mut self.perspicuity,
            Dimension::Dependability => &mut self.dependability,
            Dimension::Stimulation => &mut self.stimulation,
            Dimension::Novelty => &mut self.novelty,
        };
        *slot = text.into();
    }
}

/// Agreement value in [0, 1] per dimension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionAlignments {
    #[serde(rename = "attractiveness_alignment")]
    pub attractiveness: f64,
    #[serde(rename = "efficiency_alignment")]
    pub efficiency: f64,
    #[serde(rename = "perspicuity_alignment")]
    pub perspicuity: f64,
    #[serde(rename = "dependability_alignment")]
    pub dependability: f64,
    #[serde(rename = "stimulation_alignment")]
    pub stimulation: f64,
    #[serde(rename = "novelty_alignment")]
    pub novelty: f64,
}

impl DimensionAlignments {
    pub fn from_fn(mut f: impl FnMut(Dimension) -> f64) -> Self {
        Self {
            attractiveness: f(Dimension::Attractiveness),
            efficiency: f(Dimension::Efficiency),
            perspicuity: f(Dimension::Perspicuity),
            dependability: f(Dimension::Dependability),
            stimulation: f(Dimension::Stimulation),
            novelty: f(Dimension::Novelty),
        }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Attractiveness => self.attractiveness,
            Dimension::Efficiency => self.efficiency,
            Dimension::Perspicuity => self.perspicuity,
            Dimension::Dependability => self.dependability,
            Dimension::Stimulation => self.stimulation,
            Dimension::Novelty => self.novelty,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

/// Derived agreement for one review: per-dimension values plus their mean.
///
/// Only built by [`crate::alignment::align`] (or zeroed), so
/// `overall == mean(dimensions)` always holds for non-zeroed sets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignmentSet {
    #[serde(rename = "overall_alignment_score")]
    pub overall: f64,
    #[serde(rename = "dimension_alignments")]
    pub dimensions: DimensionAlignments,
}

impl AlignmentSet {
    pub fn zeroed() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_rejects_out_of_range() {
        assert!(Score::new(-3).is_ok());
        assert!(Score::new(3).is_ok());
        assert_eq!(Score::new(4), Err(ScoreOutOfRange { value: 4 }));
        assert_eq!(Score::new(-4), Err(ScoreOutOfRange { value: -4 }));
    }

    #[test]
    fn score_clamps_at_collaborator_boundary() {
        assert_eq!(Score::clamped(9), Score::MAX);
        assert_eq!(Score::clamped(-12), Score::MIN);
        assert_eq!(Score::clamped(1).value(), 1);
    }

    #[test]
    fn score_deserialization_is_range_checked() {
        let ok: Score = serde_json::from_str("-2").unwrap();
        assert_eq!(ok.value(), -2);
        assert!(serde_json::from_str::<Score>("7").is_err());
    }

    #[test]
    fn score_set_serializes_in_dimension_order() {
        let set = ScoreSet::zeroed().with(Dimension::Novelty, Score::MAX);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(
            json,
            r#"{"attractiveness":0,"efficiency":0,"perspicuity":0,"dependability":0,"stimulation":0,"novelty":3}"#
        );
    }

    #[test]
    fn justification_set_defaults_missing_fields() {
        let parsed: JustificationSet =
            serde_json::from_str(r#"{"efficiency": "fast"}"#).unwrap();
        assert_eq!(parsed.get(Dimension::Efficiency), "fast");
        assert_eq!(parsed.get(Dimension::Novelty), "");
    }

    #[test]
    fn dimension_parses_case_insensitively() {
        assert_eq!("Perspicuity".parse::<Dimension>().unwrap(), Dimension::Perspicuity);
        assert!("speed".parse::<Dimension>().is_err());
    }

    #[test]
    fn review_validation_rejects_bad_stars_and_blank_id() {
        assert!(Review::new("r1", "fine", 5).validate().is_ok());
        assert!(Review::new("r1", "fine", 0).validate().is_err());
        assert!(Review::new("r1", "fine", 6).validate().is_err());
        assert!(Review::new("  ", "fine", 3).validate().is_err());
    }
}
