use ux_triage_harness::history::prompt_hash;
use ux_triage_harness::{HistoryLedger, RandomScorer, Review, Session, SqliteHistoryStore};
use tempfile::tempdir;

async fn scored_session(prompt: &str, seed: u64) -> Session {
    let mut session = Session::new();
    session
        .load_reviews(vec![
            Review::new("a", "Snappy and clean", 5),
            Review::new("b", "Login loop every day", 1),
        ])
        .unwrap();
    session.set_prompt(prompt).unwrap();
    session.run_scoring(&RandomScorer::seeded(seed)).await.unwrap();
    session
}

#[tokio::test]
async fn sqlite_history_appends_and_reloads_in_insertion_order() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("history.sqlite");
    let store = SqliteHistoryStore::open(&db_path).unwrap();

    let mut session = scored_session("first prompt", 1).await;
    let first = session.analyze_persisted(&store).await.unwrap();
    session.set_prompt("second prompt").unwrap();
    let second = session.analyze_persisted(&store).await.unwrap();

    let reopened = SqliteHistoryStore::open(&db_path).unwrap();
    let entries = reopened.load().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id(), first.recorded.unwrap());
    assert_eq!(entries[1].id(), second.recorded.unwrap());
    assert_eq!(entries[0].prompt(), "first prompt");
    assert_eq!(entries[0].prompt_hash(), prompt_hash("first prompt"));

    // Values survive storage exactly.
    assert_eq!(entries.as_slice(), session.history().entries());

    let ledger = HistoryLedger::from_entries(entries);
    assert_eq!(ledger.list()[0].prompt(), "second prompt");
    assert_eq!(ledger.trend().len(), 2);
}

#[tokio::test]
async fn sqlite_history_clear_removes_everything() {
    let dir = tempdir().unwrap();
    let store = SqliteHistoryStore::open(dir.path().join("nested/dir/history.sqlite")).unwrap();

    let mut session = scored_session("p", 2).await;
    session.analyze_persisted(&store).await.unwrap();
    session.analyze_persisted(&store).await.unwrap();

    assert_eq!(store.clear().await.unwrap(), 2);
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn analysis_without_prompt_writes_nothing() {
    let dir = tempdir().unwrap();
    let store = SqliteHistoryStore::open(dir.path().join("h.sqlite")).unwrap();

    let mut session = Session::new();
    session
        .load_reviews(vec![Review::new("a", "t", 3)])
        .unwrap();
    let analysis = session.analyze_persisted(&store).await.unwrap();
    assert!(analysis.recorded.is_none());
    assert!(store.load().await.unwrap().is_empty());
}
