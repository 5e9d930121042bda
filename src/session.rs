//! Session state: the single owner of the prompt, the evaluation store, and
//! the history ledger.
//!
//! Scoring is split in two so the caller can release control while the
//! collaborator runs: [`Session::begin_scoring`] raises the in-flight flag and
//! hands out a [`ScoringTicket`]; [`Session::finish_scoring`] always lowers it
//! and applies the batch all-or-nothing.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregate::{aggregate, most_misaligned, AggregateResult, MISALIGNED_SAMPLE};
use crate::alignment::AlignmentBand;
use crate::error::SessionError;
use crate::export::{export_records, to_json, ExportRecord};
use crate::history::{HistoryEntry, HistoryLedger, SqliteHistoryStore};
use crate::import::{parse_reviews, ImportOutcome};
use crate::scorer::{MachineScores, ReviewScorer, ScoringError};
use crate::scoring::{Dimension, Review};
use crate::store::{EvaluationStore, RecomputeTarget};

/// Snapshot of what a scoring call needs, taken when the call starts.
#[derive(Debug, Clone)]
pub struct ScoringTicket {
    prompt: String,
    reviews: Vec<Review>,
}

impl ScoringTicket {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }
}

/// Result of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub aggregate: AggregateResult,
    /// Ids of the least aligned reviews, worst first.
    pub misaligned: Vec<String>,
    /// History entry written by this run, if one was.
    pub recorded: Option<Uuid>,
}

impl Analysis {
    pub fn band(&self) -> AlignmentBand {
        AlignmentBand::from_value(self.aggregate.overall)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    prompt: String,
    store: EvaluationStore,
    history: HistoryLedger,
    hide_machine_scores: bool,
    scoring_in_flight: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session on top of previously recorded history.
    pub fn with_history(history: HistoryLedger) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    // =========================================================================
    // Prompt
    // =========================================================================

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) -> Result<(), SessionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(SessionError::validation("prompt must not be blank"));
        }
        self.prompt = prompt;
        Ok(())
    }

    /// Copies a historical prompt back into the editor, verbatim.
    pub fn adopt_prompt(&mut self, entry_id: Uuid) -> Result<&str, SessionError> {
        let entry = self
            .history
            .get(entry_id)
            .ok_or_else(|| SessionError::not_found(format!("history entry {entry_id}")))?;
        self.prompt = entry.prompt().to_string();
        Ok(&self.prompt)
    }

    // =========================================================================
    // Reviews and scores
    // =========================================================================

    pub fn store(&self) -> &EvaluationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EvaluationStore {
        &mut self.store
    }

    pub fn load_reviews(&mut self, reviews: Vec<Review>) -> Result<usize, SessionError> {
        let count = self.store.load_reviews(reviews)?;
        info!(reviews = count, "reviews loaded");
        Ok(count)
    }

    /// Imports a JSON payload, keeping valid records and reporting the rest.
    pub fn import_reviews(&mut self, raw: &str) -> Result<ImportOutcome, SessionError> {
        let outcome = parse_reviews(raw)?;
        self.load_reviews(outcome.reviews.clone())?;
        Ok(outcome)
    }

    pub fn set_human_score(
        &mut self,
        review_id: &str,
        dimension: Dimension,
        score: i64,
    ) -> Result<(), SessionError> {
        self.store.set_human_score(review_id, dimension, score)
    }

    /// Commits pending human edits for one review by recomputing its alignment.
    pub fn commit_review(&mut self, review_id: &str) -> Result<(), SessionError> {
        self.store
            .recompute_alignment(RecomputeTarget::Review(review_id))
            .map(|_| ())
    }

    pub fn hide_machine_scores(&self) -> bool {
        self.hide_machine_scores
    }

    /// Flips the display flag and returns the new value.
    pub fn toggle_hide_machine_scores(&mut self) -> bool {
        self.hide_machine_scores = !self.hide_machine_scores;
        self.hide_machine_scores
    }

    // =========================================================================
    // Scoring lifecycle
    // =========================================================================

    pub fn is_scoring(&self) -> bool {
        self.scoring_in_flight
    }

    pub fn begin_scoring(&mut self) -> Result<ScoringTicket, SessionError> {
        if self.scoring_in_flight {
            return Err(SessionError::ScoringInFlight);
        }
        if self.prompt.trim().is_empty() {
            return Err(SessionError::validation("set a prompt before scoring"));
        }
        if self.store.is_empty() {
            return Err(SessionError::validation("load reviews before scoring"));
        }

        self.scoring_in_flight = true;
        let ticket = ScoringTicket {
            prompt: self.prompt.clone(),
            reviews: self.store.reviews().cloned().collect(),
        };
        info!(reviews = ticket.reviews.len(), "scoring call started");
        Ok(ticket)
    }

    /// Applies a finished scoring call. On any error the store is untouched.
    pub fn finish_scoring(
        &mut self,
        ticket: ScoringTicket,
        result: Result<Vec<MachineScores>, ScoringError>,
    ) -> Result<usize, SessionError> {
        self.scoring_in_flight = false;

        let applied = result
            .and_then(|batch| check_coverage(&ticket, batch))
            .map_err(SessionError::from)
            .and_then(|batch| self.store.apply_machine_batch(batch));

        match applied {
            Ok(count) => {
                self.store.recompute_all();
                info!(reviews = count, "scoring call applied");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "scoring call failed; store unchanged");
                Err(e)
            }
        }
    }

    /// Runs a scoring call end to end.
    pub async fn run_scoring(&mut self, scorer: &dyn ReviewScorer) -> Result<usize, SessionError> {
        let ticket = self.begin_scoring()?;
        let result = scorer.score_batch(&ticket.prompt, &ticket.reviews).await;
        self.finish_scoring(ticket, result)
    }

    // =========================================================================
    // Analysis and history
    // =========================================================================

    pub fn aggregate(&self) -> AggregateResult {
        aggregate(self.store.evaluations())
    }

    /// Recomputes all alignment, aggregates, and records a history snapshot
    /// when a prompt is set and there is something to snapshot.
    pub fn analyze(&mut self) -> Analysis {
        let (analysis, pending) = self.measure();
        if let Some(entry) = pending {
            self.record_snapshot(entry);
        }
        analysis
    }

    /// [`Session::analyze`], writing the snapshot to disk before it enters the
    /// in-memory ledger. If the write fails the ledger is left as it was.
    pub async fn analyze_persisted(
        &mut self,
        ledger_store: &SqliteHistoryStore,
    ) -> Result<Analysis, SessionError> {
        let (analysis, pending) = self.measure();
        if let Some(entry) = pending {
            ledger_store.append(&entry).await?;
            self.record_snapshot(entry);
        }
        Ok(analysis)
    }

    /// Fresh aggregate plus the history entry it would produce, not yet recorded.
    fn measure(&mut self) -> (Analysis, Option<HistoryEntry>) {
        self.store.recompute_all();
        let aggregate = self.aggregate();
        let misaligned = most_misaligned(self.store.evaluations(), MISALIGNED_SAMPLE)
            .into_iter()
            .map(|e| e.id().to_string())
            .collect();

        let pending = (!self.prompt.trim().is_empty() && !aggregate.is_empty())
            .then(|| HistoryEntry::capture(&self.prompt, &aggregate));

        let analysis = Analysis {
            aggregate,
            misaligned,
            recorded: pending.as_ref().map(HistoryEntry::id),
        };
        (analysis, pending)
    }

    fn record_snapshot(&mut self, entry: HistoryEntry) {
        let entry = self.history.append(entry);
        info!(
            entry = %entry.id(),
            overall = entry.overall(),
            "history snapshot recorded"
        );
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Export records with freshly derived alignment.
    pub fn export_records(&mut self) -> Vec<ExportRecord> {
        self.store.recompute_all();
        export_records(self.store.evaluations())
    }

    pub fn export_json(&mut self) -> Result<String, SessionError> {
        to_json(&self.export_records())
    }

    /// Replaces all evaluations with the ones in an export document.
    pub fn restore_from_export(&mut self, records: Vec<ExportRecord>) -> Result<usize, SessionError> {
        let evaluations = records.into_iter().map(ExportRecord::into_evaluation).collect();
        let count = self.store.restore(evaluations)?;
        info!(reviews = count, "evaluations restored from export");
        Ok(count)
    }
}

/// Exactly one result per ticketed review, nothing else.
fn check_coverage(
    ticket: &ScoringTicket,
    batch: Vec<MachineScores>,
) -> Result<Vec<MachineScores>, ScoringError> {
    let expected: HashSet<&str> = ticket.reviews.iter().map(|r| r.id.as_str()).collect();
    if let Some(stray) = batch
        .iter()
        .find(|m| !expected.contains(m.review_id.as_str()))
    {
        return Err(ScoringError::UnknownReview(stray.review_id.clone()));
    }

    let covered: HashSet<&str> = batch.iter().map(|m| m.review_id.as_str()).collect();
    if batch.len() != expected.len() || covered.len() != expected.len() {
        return Err(ScoringError::Incomplete {
            expected: expected.len(),
            received: covered.len(),
        });
    }
    Ok(batch)
}
