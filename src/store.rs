//! Evaluation store: one evaluation per loaded review, keyed by review id.
//!
//! Mutations never recompute alignment on their own; callers invoke
//! [`EvaluationStore::recompute_alignment`] at the points where a batch of
//! edits is committed.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::alignment::align;
use crate::error::SessionError;
use crate::scorer::MachineScores;
use crate::scoring::{AlignmentSet, Dimension, JustificationSet, Review, Score, ScoreSet};

// =============================================================================
// Evaluation
// =============================================================================

/// A review with both score sets, the machine justifications, and the
/// alignment derived from the last recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    review: Review,
    human: ScoreSet,
    machine: ScoreSet,
    justifications: JustificationSet,
    alignment: AlignmentSet,
}

impl Evaluation {
    /// Zeroed scores, empty justifications, zero alignment.
    pub fn new(review: Review) -> Self {
        Self {
            review,
            human: ScoreSet::zeroed(),
            machine: ScoreSet::zeroed(),
            justifications: JustificationSet::default(),
            alignment: AlignmentSet::zeroed(),
        }
    }

    /// Evaluation with both sides already scored; alignment is derived here.
    pub fn with_scores(
        review: Review,
        human: ScoreSet,
        machine: ScoreSet,
        justifications: JustificationSet,
    ) -> Self {
        let mut evaluation = Self {
            review,
            human,
            machine,
            justifications,
            alignment: AlignmentSet::zeroed(),
        };
        evaluation.recompute();
        evaluation
    }

    pub fn id(&self) -> &str {
        &self.review.id
    }

    pub fn review(&self) -> &Review {
        &self.review
    }

    pub fn human(&self) -> &ScoreSet {
        &self.human
    }

    pub fn machine(&self) -> &ScoreSet {
        &self.machine
    }

    pub fn justifications(&self) -> &JustificationSet {
        &self.justifications
    }

    pub fn alignment(&self) -> &AlignmentSet {
        &self.alignment
    }

    /// Overall alignment as of the last recompute.
    pub fn overall(&self) -> f64 {
        self.alignment.overall
    }

    fn recompute(&mut self) {
        self.alignment = align(&self.machine, &self.human);
    }
}

// =============================================================================
// Store
// =============================================================================

/// Which evaluations a recompute covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeTarget<'a> {
    Review(&'a str),
    All,
}

/// Step-through navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationStore {
    evaluations: Vec<Evaluation>,
    index: HashMap<String, usize>,
    selected: usize,
}

impl EvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every review and seeds a zeroed evaluation for each.
    ///
    /// The whole batch is rejected if any review is invalid or an id repeats.
    pub fn load_reviews(&mut self, reviews: Vec<Review>) -> Result<usize, SessionError> {
        let evaluations = reviews.into_iter().map(Evaluation::new).collect();
        self.replace_all(evaluations)
    }

    /// Replaces every evaluation, keeping the scores they carry.
    pub fn restore(&mut self, evaluations: Vec<Evaluation>) -> Result<usize, SessionError> {
        self.replace_all(evaluations)
    }

    fn replace_all(&mut self, evaluations: Vec<Evaluation>) -> Result<usize, SessionError> {
        let mut index = HashMap::with_capacity(evaluations.len());
        for (position, evaluation) in evaluations.iter().enumerate() {
            evaluation.review.validate()?;
            if index.insert(evaluation.id().to_string(), position).is_some() {
                return Err(SessionError::validation(format!(
                    "duplicate review id: {}",
                    evaluation.id()
                )));
            }
        }

        let count = evaluations.len();
        self.evaluations = evaluations;
        self.index = index;
        self.selected = 0;
        debug!(reviews = count, "evaluation store reloaded");
        Ok(count)
    }

    pub fn clear(&mut self) {
        self.evaluations.clear();
        self.index.clear();
        self.selected = 0;
    }

    /// Sets one human score cell. Alignment is not recomputed.
    pub fn set_human_score(
        &mut self,
        review_id: &str,
        dimension: Dimension,
        score: i64,
    ) -> Result<(), SessionError> {
        let score = Score::new(score)?;
        let position = self.position(review_id)?;
        self.evaluations[position].human.set(dimension, score);
        Ok(())
    }

    /// Replaces the whole human score set of one review.
    pub fn replace_human_scores(
        &mut self,
        review_id: &str,
        scores: ScoreSet,
    ) -> Result<(), SessionError> {
        let position = self.position(review_id)?;
        self.evaluations[position].human = scores;
        Ok(())
    }

    /// Bulk-replaces the machine side of one review.
    pub fn replace_machine_scores(
        &mut self,
        review_id: &str,
        scores: ScoreSet,
        justifications: JustificationSet,
    ) -> Result<(), SessionError> {
        let position = self.position(review_id)?;
        let evaluation = &mut self.evaluations[position];
        evaluation.machine = scores;
        evaluation.justifications = justifications;
        Ok(())
    }

    /// Applies a scoring batch. Every id is checked before anything is written.
    pub fn apply_machine_batch(&mut self, batch: Vec<MachineScores>) -> Result<usize, SessionError> {
        let positions = batch
            .iter()
            .map(|result| self.position(&result.review_id))
            .collect::<Result<Vec<_>, _>>()?;

        let count = batch.len();
        for (position, result) in positions.into_iter().zip(batch) {
            let evaluation = &mut self.evaluations[position];
            evaluation.machine = result.scores;
            evaluation.justifications = result.justifications;
        }
        Ok(count)
    }

    /// Re-derives alignment from the current score sets. Idempotent.
    pub fn recompute_alignment(&mut self, target: RecomputeTarget<'_>) -> Result<usize, SessionError> {
        match target {
            RecomputeTarget::Review(review_id) => {
                let position = self.position(review_id)?;
                self.evaluations[position].recompute();
                Ok(1)
            }
            RecomputeTarget::All => Ok(self.recompute_all()),
        }
    }

    /// Re-derives alignment for every evaluation and returns how many there were.
    pub fn recompute_all(&mut self) -> usize {
        for evaluation in &mut self.evaluations {
            evaluation.recompute();
        }
        self.evaluations.len()
    }

    /// Moves the step-through pointer, clamped to the loaded range.
    pub fn select_review(&mut self, index: usize) -> usize {
        self.selected = index.min(self.evaluations.len().saturating_sub(1));
        self.selected
    }

    /// Moves one review back or forward; stays put at either end.
    pub fn step(&mut self, direction: Direction) -> usize {
        let target = match direction {
            Direction::Previous => self.selected.saturating_sub(1),
            Direction::Next => self.selected.saturating_add(1),
        };
        self.select_review(target)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn current(&self) -> Option<&Evaluation> {
        self.evaluations.get(self.selected)
    }

    pub fn get(&self, review_id: &str) -> Option<&Evaluation> {
        self.index.get(review_id).map(|&i| &self.evaluations[i])
    }

    pub fn contains(&self, review_id: &str) -> bool {
        self.index.contains_key(review_id)
    }

    /// Evaluations in load order.
    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    pub fn reviews(&self) -> impl Iterator<Item = &Review> {
        self.evaluations.iter().map(Evaluation::review)
    }

    pub fn len(&self) -> usize {
        self.evaluations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty()
    }

    fn position(&self, review_id: &str) -> Result<usize, SessionError> {
        self.index
            .get(review_id)
            .copied()
            .ok_or_else(|| SessionError::not_found(format!("review {review_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(ids: &[&str]) -> EvaluationStore {
        let mut store = EvaluationStore::new();
        store
            .load_reviews(ids.iter().map(|id| Review::new(*id, "text", 4)).collect())
            .unwrap();
        store
    }

    #[test]
    fn load_seeds_zeroed_evaluations() {
        let store = store_with(&["a", "b"]);
        assert_eq!(store.len(), 2);
        let a = store.get("a").unwrap();
        assert_eq!(*a.human(), ScoreSet::zeroed());
        assert_eq!(*a.machine(), ScoreSet::zeroed());
        assert_eq!(a.overall(), 0.0);
    }

    #[test]
    fn load_rejects_whole_batch_on_invalid_review() {
        let mut store = store_with(&["keep"]);
        let err = store
            .load_reviews(vec![Review::new("a", "ok", 3), Review::new("b", "bad", 9)])
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert!(store.contains("keep"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn recompute_all_refreshes_every_evaluation() {
        let mut store = store_with(&["a", "b"]);
        store.set_human_score("a", Dimension::Novelty, 3).unwrap();
        store.set_human_score("b", Dimension::Efficiency, -3).unwrap();
        assert_eq!(store.get("a").unwrap().overall(), 0.0);

        assert_eq!(store.recompute_all(), 2);
        let a = store.get("a").unwrap().alignment().dimensions;
        let b = store.get("b").unwrap().alignment().dimensions;
        assert_eq!(a.novelty, 0.5);
        assert_eq!(b.efficiency, 0.5);
        assert_eq!(store.recompute_all(), 2);
        assert_eq!(store.get("a").unwrap().alignment().dimensions, a);
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let mut store = EvaluationStore::new();
        let err = store
            .load_reviews(vec![Review::new("a", "x", 3), Review::new("a", "y", 3)])
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn set_human_score_rejects_out_of_range_without_mutation() {
        let mut store = store_with(&["a"]);
        let err = store
            .set_human_score("a", Dimension::Efficiency, 4)
            .unwrap_err();
        assert!(matches!(err, SessionError::Range(_)));
        assert_eq!(*store.get("a").unwrap().human(), ScoreSet::zeroed());
    }

    #[test]
    fn set_human_score_does_not_recompute() {
        let mut store = store_with(&["a"]);
        store.recompute_alignment(RecomputeTarget::All).unwrap();
        assert_eq!(store.get("a").unwrap().overall(), 1.0);

        store.set_human_score("a", Dimension::Novelty, -3).unwrap();
        assert_eq!(store.get("a").unwrap().overall(), 1.0);

        store.recompute_alignment(RecomputeTarget::Review("a")).unwrap();
        assert!((store.get("a").unwrap().overall() - 5.5 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_review_is_not_found() {
        let mut store = store_with(&["a"]);
        assert!(matches!(
            store.recompute_alignment(RecomputeTarget::Review("zzz")),
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            store.set_human_score("zzz", Dimension::Novelty, 1),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn machine_batch_is_all_or_nothing() {
        let mut store = store_with(&["a", "b"]);
        let batch = vec![
            MachineScores::new("a", ScoreSet::uniform(Score::MAX), JustificationSet::default()),
            MachineScores::new("ghost", ScoreSet::uniform(Score::MIN), JustificationSet::default()),
        ];
        assert!(store.apply_machine_batch(batch).is_err());
        assert_eq!(*store.get("a").unwrap().machine(), ScoreSet::zeroed());
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut store = store_with(&["a"]);
        store.set_human_score("a", Dimension::Stimulation, 2).unwrap();
        store.recompute_alignment(RecomputeTarget::All).unwrap();
        let first = *store.get("a").unwrap().alignment();
        store.recompute_alignment(RecomputeTarget::All).unwrap();
        assert_eq!(first, *store.get("a").unwrap().alignment());
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut store = store_with(&["a", "b", "c"]);
        assert_eq!(store.select_review(10), 2);
        assert_eq!(store.step(Direction::Next), 2);
        assert_eq!(store.step(Direction::Previous), 1);
        store.select_review(0);
        assert_eq!(store.step(Direction::Previous), 0);
        assert_eq!(store.current().unwrap().id(), "a");
    }

    #[test]
    fn navigation_on_empty_store_stays_at_zero() {
        let mut store = EvaluationStore::new();
        assert_eq!(store.select_review(5), 0);
        assert!(store.current().is_none());
    }
}
