//! Simulated scorer: uniform random scores with templated justifications.
//!
//! Stands in for a model when iterating on the workflow offline. Seed it for
//! reproducible runs.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{MachineScores, ReviewScorer, ScoringError};
use crate::scoring::{Dimension, JustificationSet, Review, Score, ScoreSet, SCORE_MAX, SCORE_MIN};

pub struct RandomScorer {
    rng: Mutex<StdRng>,
    latency: Duration,
}

impl RandomScorer {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            latency: Duration::ZERO,
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            latency: Duration::ZERO,
        }
    }

    /// Sleeps this long before answering, to mimic a remote call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn draw(&self, reviews: &[Review]) -> Vec<MachineScores> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            // The generator holds no invariant a panic could break.
            Err(poisoned) => poisoned.into_inner(),
        };
        reviews
            .iter()
            .map(|review| {
                let scores = ScoreSet::from_fn(|_| {
                    Score::clamped(i64::from(rng.gen_range(SCORE_MIN..=SCORE_MAX)))
                });
                let justifications = JustificationSet::from_fn(|d| justify(d, scores.get(d)));
                MachineScores::new(review.id.clone(), scores, justifications)
            })
            .collect()
    }
}

#[async_trait]
impl ReviewScorer for RandomScorer {
    async fn score_batch(
        &self,
        _prompt: &str,
        reviews: &[Review],
    ) -> Result<Vec<MachineScores>, ScoringError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let results = self.draw(reviews);
        debug!(reviews = results.len(), "simulated scores drawn");
        Ok(results)
    }
}

/// One sentence describing which way the score leans.
pub fn justify(dimension: Dimension, score: Score) -> String {
    let v = score.value();
    let pick = |positive: &'static str, negative: &'static str, neutral: &'static str| {
        if v > 0 {
            positive
        } else if v < 0 {
            negative
        } else {
            neutral
        }
    };

    match dimension {
        Dimension::Attractiveness => format!(
            "The comment {} feelings about the app's attractiveness.",
            pick("indicates positive", "shows negative", "has neutral")
        ),
        Dimension::Efficiency => format!(
            "Based on the review, the app's efficiency appears to be {}.",
            pick("good", "poor", "average")
        ),
        Dimension::Perspicuity => format!(
            "The user finds the app {} to understand and use.",
            pick("easy", "difficult", "moderately easy")
        ),
        Dimension::Dependability => format!(
            "The app {} based on the review.",
            pick(
                "seems reliable",
                "shows signs of unreliability",
                "has average reliability"
            )
        ),
        Dimension::Stimulation => format!(
            "The user appears {} in using the app.",
            pick(
                "engaged and interested",
                "bored or disinterested",
                "neither particularly engaged nor disinterested"
            )
        ),
        Dimension::Novelty => format!(
            "The app {} according to this review.",
            pick(
                "offers innovative features",
                "lacks originality",
                "has some standard features"
            )
        ),
    }
}
