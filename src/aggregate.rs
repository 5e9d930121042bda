//! Aggregation over all evaluations: overall and per-dimension means,
//! best/worst dimension, and misalignment ranking.
//!
//! Empty input is not an error; it produces [`AggregateResult::empty`].

use serde::{Deserialize, Serialize};

use crate::scoring::{Dimension, DimensionAlignments};
use crate::store::Evaluation;

/// How many of the least aligned reviews an analysis surfaces.
pub const MISALIGNED_SAMPLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub evaluation_count: usize,
    /// Mean of the per-evaluation overall values.
    pub overall: f64,
    pub per_dimension: DimensionAlignments,
    pub best: Dimension,
    pub worst: Dimension,
}

impl AggregateResult {
    /// Zeroed result. Best/worst fall back to the first dimension by the usual tie-break.
    pub fn empty() -> Self {
        Self {
            evaluation_count: 0,
            overall: 0.0,
            per_dimension: DimensionAlignments::default(),
            best: Dimension::ALL[0],
            worst: Dimension::ALL[0],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.evaluation_count == 0
    }
}

impl Default for AggregateResult {
    fn default() -> Self {
        Self::empty()
    }
}

pub fn aggregate(evaluations: &[Evaluation]) -> AggregateResult {
    if evaluations.is_empty() {
        return AggregateResult::empty();
    }

    let n = evaluations.len() as f64;
    let per_dimension = DimensionAlignments::from_fn(|d| {
        let sum: f64 = evaluations
            .iter()
            .map(|e| e.alignment().dimensions.get(d))
            .sum();
        sum / n
    });
    let overall = evaluations.iter().map(Evaluation::overall).sum::<f64>() / n;

    AggregateResult {
        evaluation_count: evaluations.len(),
        overall,
        per_dimension,
        best: best_dimension(&per_dimension),
        worst: worst_dimension(&per_dimension),
    }
}

/// Strict maximum; ties go to the earliest dimension in declaration order.
pub fn best_dimension(per_dimension: &DimensionAlignments) -> Dimension {
    pick_dimension(per_dimension, |candidate, current| candidate > current)
}

/// Strict minimum; ties go to the earliest dimension in declaration order.
pub fn worst_dimension(per_dimension: &DimensionAlignments) -> Dimension {
    pick_dimension(per_dimension, |candidate, current| candidate < current)
}

fn pick_dimension(
    per_dimension: &DimensionAlignments,
    replaces: impl Fn(f64, f64) -> bool,
) -> Dimension {
    let mut chosen = Dimension::ALL[0];
    let mut chosen_value = per_dimension.get(chosen);
    for (dimension, value) in per_dimension.iter().skip(1) {
        if replaces(value, chosen_value) {
            chosen = dimension;
            chosen_value = value;
        }
    }
    chosen
}

/// Least aligned first. Stable: equal values keep their input order.
pub fn rank_by_misalignment(evaluations: &[Evaluation]) -> Vec<&Evaluation> {
    let mut ranked: Vec<&Evaluation> = evaluations.iter().collect();
    ranked.sort_by(|a, b| a.overall().total_cmp(&b.overall()));
    ranked
}

/// The `n` least aligned evaluations.
pub fn most_misaligned(evaluations: &[Evaluation], n: usize) -> Vec<&Evaluation> {
    let mut ranked = rank_by_misalignment(evaluations);
    ranked.truncate(n);
    ranked
}
