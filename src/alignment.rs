//! Alignment engine: the single definition of human/machine agreement.
//!
//! Everything else (store recompute, aggregation, history snapshots) goes
//! through these functions.

use serde::{Deserialize, Serialize};

use crate::scoring::{AlignmentSet, Dimension, DimensionAlignments, Score, ScoreSet};

/// Largest possible distance between two scores (-3 vs 3).
pub const MAX_SCORE_DISTANCE: f64 = 6.0;

/// Agreement between a machine and a human score: `1 - |m - h| / 6`.
///
/// Symmetric, 1.0 for identical scores, 0.0 for opposite extremes, and always
/// one of {0, 1/6, ..., 1}.
pub fn alignment(machine: Score, human: Score) -> f64 {
    let distance = (i16::from(machine.value()) - i16::from(human.value())).abs();
    1.0 - f64::from(distance) / MAX_SCORE_DISTANCE
}

/// Arithmetic mean of the six per-dimension values, summed in dimension order.
pub fn overall_alignment(dimensions: &DimensionAlignments) -> f64 {
    let sum: f64 = dimensions.iter().map(|(_, value)| value).sum();
    sum / Dimension::COUNT as f64
}

/// Full alignment set for one machine/human score pair.
pub fn align(machine: &ScoreSet, human: &ScoreSet) -> AlignmentSet {
    let dimensions = DimensionAlignments::from_fn(|d| alignment(machine.get(d), human.get(d)));
    AlignmentSet {
        overall: overall_alignment(&dimensions),
        dimensions,
    }
}

// =============================================================================
// Bands
// =============================================================================

/// Qualitative reading of an alignment value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentBand {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl AlignmentBand {
    pub const EXCELLENT_MIN: f64 = 0.8;
    pub const GOOD_MIN: f64 = 0.5;
    pub const MODERATE_MIN: f64 = 0.3;

    pub fn from_value(value: f64) -> Self {
        if value >= Self::EXCELLENT_MIN {
            AlignmentBand::Excellent
        } else if value >= Self::GOOD_MIN {
            AlignmentBand::Good
        } else if value >= Self::MODERATE_MIN {
            AlignmentBand::Moderate
        } else {
            AlignmentBand::Poor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlignmentBand::Excellent => "excellent",
            AlignmentBand::Good => "good",
            AlignmentBand::Moderate => "moderate",
            AlignmentBand::Poor => "poor",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            AlignmentBand::Excellent => "Excellent alignment between LLM and human evaluations.",
            AlignmentBand::Good => "Good alignment between LLM and human evaluations.",
            AlignmentBand::Moderate => "Moderate alignment between LLM and human evaluations.",
            AlignmentBand::Poor => "Poor alignment between LLM and human evaluations.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: i64) -> Score {
        Score::new(v).unwrap()
    }

    #[test]
    fn identical_scores_align_perfectly() {
        for score in Score::all() {
            assert_eq!(alignment(score, score), 1.0);
        }
    }

    #[test]
    fn opposite_extremes_do_not_align() {
        assert_eq!(alignment(s(3), s(-3)), 0.0);
        assert_eq!(alignment(s(-3), s(3)), 0.0);
    }

    #[test]
    fn one_step_apart_is_five_sixths() {
        assert!((alignment(s(1), s(2)) - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn align_single_dimension_disagreement() {
        let human = ScoreSet::zeroed().with(Dimension::Attractiveness, s(3));
        let machine = ScoreSet::zeroed().with(Dimension::Attractiveness, s(-3));
        let set = align(&machine, &human);
        assert_eq!(set.dimensions.attractiveness, 0.0);
        assert_eq!(set.dimensions.novelty, 1.0);
        assert!((set.overall - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(AlignmentBand::from_value(1.0), AlignmentBand::Excellent);
        assert_eq!(AlignmentBand::from_value(0.8), AlignmentBand::Excellent);
        assert_eq!(AlignmentBand::from_value(0.79), AlignmentBand::Good);
        assert_eq!(AlignmentBand::from_value(0.5), AlignmentBand::Good);
        assert_eq!(AlignmentBand::from_value(0.3), AlignmentBand::Moderate);
        assert_eq!(AlignmentBand::from_value(0.29), AlignmentBand::Poor);
    }
}
