//! Prompt history ledger.
//!
//! Append-only record of aggregate snapshots, one per analysis run, tied to
//! the prompt text that produced them. Storage keeps insertion order;
//! [`HistoryLedger::list`] presents newest first.

pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AggregateResult;
use crate::scoring::DimensionAlignments;

pub use sqlite::{HistoryStoreError, SqliteHistoryStore};

/// Immutable snapshot of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    id: Uuid,
    prompt: String,
    prompt_hash: String,
    timestamp: DateTime<Utc>,
    snapshot: AggregateResult,
}

impl HistoryEntry {
    /// A snapshot of `snapshot` for `prompt`, stamped now. Not yet in any ledger.
    pub fn capture(prompt: &str, snapshot: &AggregateResult) -> Self {
        Self::new(prompt, *snapshot, Utc::now())
    }

    fn new(prompt: &str, snapshot: AggregateResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.to_string(),
            prompt_hash: prompt_hash(prompt),
            timestamp,
            snapshot,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// blake3 of the prompt text; equal for revisions with identical text.
    pub fn prompt_hash(&self) -> &str {
        &self.prompt_hash
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn snapshot(&self) -> &AggregateResult {
        &self.snapshot
    }

    pub fn overall(&self) -> f64 {
        self.snapshot.overall
    }

    pub fn dimension_alignments(&self) -> &DimensionAlignments {
        &self.snapshot.per_dimension
    }
}

pub fn prompt_hash(prompt: &str) -> String {
    blake3::hash(prompt.as_bytes()).to_hex().to_string()
}

/// One point of the alignment trend, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub overall: f64,
    pub per_dimension: DimensionAlignments,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from entries in insertion order (e.g. loaded from disk).
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Appends a snapshot with a fresh id and the current time.
    pub fn record(&mut self, prompt: &str, snapshot: &AggregateResult) -> &HistoryEntry {
        self.append(HistoryEntry::capture(prompt, snapshot))
    }

    /// Appends an entry captured earlier, e.g. once it is safely on disk.
    pub fn append(&mut self, entry: HistoryEntry) -> &HistoryEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Newest first.
    pub fn list(&self) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().collect()
    }

    /// Insertion order, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Entries recorded for exactly this prompt text, newest first.
    pub fn revisions_of(&self, prompt: &str) -> Vec<&HistoryEntry> {
        let hash = prompt_hash(prompt);
        self.entries
            .iter()
            .rev()
            .filter(|e| e.prompt_hash == hash)
            .collect()
    }

    /// Highest overall alignment; earliest entry wins ties.
    pub fn best(&self) -> Option<&HistoryEntry> {
        self.entries.iter().fold(None, |best, entry| match best {
            Some(current) if entry.overall() <= current.overall() => Some(current),
            _ => Some(entry),
        })
    }

    pub fn trend(&self) -> Vec<TrendPoint> {
        self.entries
            .iter()
            .map(|e| TrendPoint {
                timestamp: e.timestamp,
                overall: e.snapshot.overall,
                per_dimension: e.snapshot.per_dimension,
            })
            .collect()
    }

    /// Replaces the whole ledger with an empty one.
    pub fn clear(&mut self) {
        self.entries = Vec::new();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(overall: f64) -> AggregateResult {
        AggregateResult {
            evaluation_count: 1,
            overall,
            per_dimension: DimensionAlignments::from_fn(|_| overall),
            ..AggregateResult::empty()
        }
    }

    #[test]
    fn list_is_newest_first_without_reordering_storage() {
        let mut ledger = HistoryLedger::new();
        ledger.record("v1", &snapshot(0.4));
        ledger.record("v2", &snapshot(0.9));

        let listed: Vec<&str> = ledger.list().iter().map(|e| e.prompt()).collect();
        assert_eq!(listed, vec!["v2", "v1"]);
        assert_eq!(ledger.entries()[0].prompt(), "v1");
        assert_eq!(ledger.latest().unwrap().prompt(), "v2");
    }

    #[test]
    fn entries_get_unique_ids() {
        let mut ledger = HistoryLedger::new();
        let a = ledger.record("same", &snapshot(0.5)).id();
        let b = ledger.record("same", &snapshot(0.5)).id();
        assert_ne!(a, b);
        assert_eq!(ledger.revisions_of("same").len(), 2);
        assert!(ledger.revisions_of("other").is_empty());
    }

    #[test]
    fn best_prefers_earliest_on_tie() {
        let mut ledger = HistoryLedger::new();
        let first = ledger.record("a", &snapshot(0.7)).id();
        ledger.record("b", &snapshot(0.7));
        ledger.record("c", &snapshot(0.2));
        assert_eq!(ledger.best().unwrap().id(), first);
    }

    #[test]
    fn trend_is_oldest_first() {
        let mut ledger = HistoryLedger::new();
        ledger.record("a", &snapshot(0.1));
        ledger.record("b", &snapshot(0.6));
        let overall: Vec<f64> = ledger.trend().iter().map(|p| p.overall).collect();
        assert_eq!(overall, vec![0.1, 0.6]);
    }

    #[test]
    fn clear_empties_the_ledger() {
        let mut ledger = HistoryLedger::new();
        ledger.record("a", &snapshot(0.1));
        ledger.clear();
        assert!(ledger.is_empty());
        assert!(ledger.best().is_none());
    }
}
