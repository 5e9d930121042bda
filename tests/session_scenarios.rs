use ux_triage_harness::aggregate::AggregateResult;
use ux_triage_harness::{
    Dimension, DimensionAlignments, Direction, HistoryLedger, JustificationSet, MachineScores,
    RandomScorer, RecomputeTarget, Review, Score, ScoreSet, ScoringError, Session, SessionError,
};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn perfect_agreement_on_zeroed_scores() {
    let mut session = Session::new();
    session
        .load_reviews(vec![Review::new("only", "Does the job.", 5)])
        .unwrap();

    let store = session.store_mut();
    for dimension in Dimension::ALL {
        store.set_human_score("only", dimension, 0).unwrap();
    }
    store
        .replace_machine_scores("only", ScoreSet::zeroed(), JustificationSet::default())
        .unwrap();
    store.recompute_alignment(RecomputeTarget::Review("only")).unwrap();

    let alignment = *store.get("only").unwrap().alignment();
    assert_eq!(alignment.dimensions, DimensionAlignments::from_fn(|_| 1.0));
    assert_eq!(alignment.overall, 1.0);
}

#[test]
fn opposite_attractiveness_costs_one_dimension() {
    let mut session = Session::new();
    session
        .load_reviews(vec![Review::new("r", "Ugly but works.", 3)])
        .unwrap();

    session
        .set_human_score("r", Dimension::Attractiveness, 3)
        .unwrap();
    session
        .store_mut()
        .replace_machine_scores(
            "r",
            ScoreSet::zeroed().with(Dimension::Attractiveness, Score::MIN),
            JustificationSet::default(),
        )
        .unwrap();
    session.commit_review("r").unwrap();

    let alignment = *session.store().get("r").unwrap().alignment();
    assert_eq!(alignment.dimensions.attractiveness, 0.0);
    for dimension in &Dimension::ALL[1..] {
        assert_eq!(alignment.dimensions.get(*dimension), 1.0);
    }
    assert!(approx_eq(alignment.overall, 5.0 / 6.0, 1e-12));
}

#[test]
fn history_lists_newest_first_and_prompts_can_be_readopted() {
    let snapshot = |overall: f64| AggregateResult {
        evaluation_count: 1,
        overall,
        per_dimension: DimensionAlignments::from_fn(|_| overall),
        ..AggregateResult::empty()
    };

    let mut ledger = HistoryLedger::new();
    let first = ledger.record("Prompt v1: be lenient.", &snapshot(0.4)).id();
    ledger.record("Prompt v2: be strict.", &snapshot(0.9));
    let mut session = Session::with_history(ledger);

    let listed: Vec<f64> = session.history().list().iter().map(|e| e.overall()).collect();
    assert_eq!(listed, vec![0.9, 0.4]);

    session.set_prompt("something else").unwrap();
    assert_eq!(session.adopt_prompt(first).unwrap(), "Prompt v1: be lenient.");
    assert_eq!(session.prompt(), "Prompt v1: be lenient.");
}

#[test]
fn import_keeps_valid_records_and_reports_rejects() {
    let raw = r#"[
        {"id": "1", "text": "Great app", "stars": 5},
        {"id": "2", "text": "No stars here"},
        {"id": "3", "text": "Okay", "stars": 3},
        {"id": "4", "text": "Also missing"},
        {"id": "5", "text": "Terrible", "stars": 1}
    ]"#;

    let mut session = Session::new();
    let outcome = session.import_reviews(raw).unwrap();
    assert_eq!(outcome.rejected_count(), 2);
    assert_eq!(session.store().len(), 3);
    let ids: Vec<&str> = session.store().evaluations().iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec!["1", "3", "5"]);
}

#[test]
fn invalid_human_score_is_rejected_without_side_effects() {
    let mut session = Session::new();
    session.load_reviews(vec![Review::new("r", "t", 2)]).unwrap();
    let before = session.store().evaluations().to_vec();

    let err = session
        .set_human_score("r", Dimension::Novelty, 4)
        .unwrap_err();
    assert!(matches!(err, SessionError::Range(_)));
    let err = session
        .set_human_score("missing", Dimension::Novelty, 1)
        .unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
    assert_eq!(session.store().evaluations(), before.as_slice());
}

#[test]
fn reloading_reviews_discards_previous_evaluations() {
    let mut session = Session::new();
    session.load_reviews(vec![Review::new("old", "t", 2)]).unwrap();
    session.set_human_score("old", Dimension::Efficiency, 2).unwrap();

    session.load_reviews(vec![Review::new("new", "t", 4)]).unwrap();
    assert!(session.store().get("old").is_none());
    assert_eq!(session.store().get("new").unwrap().human(), &ScoreSet::zeroed());

    let err = session
        .load_reviews(vec![Review::new("bad", "t", 0)])
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert!(session.store().contains("new"));
}

#[test]
fn failed_scoring_call_changes_nothing_and_clears_the_flag() {
    let mut session = Session::new();
    session
        .load_reviews(vec![Review::new("a", "t", 3), Review::new("b", "t", 3)])
        .unwrap();
    session.set_prompt("Score it.").unwrap();
    let before = session.store().evaluations().to_vec();

    let ticket = session.begin_scoring().unwrap();
    assert_eq!(ticket.reviews().len(), 2);
    let failure = Err(ScoringError::parse("b", "garbled"));
    let err = session.finish_scoring(ticket, failure).unwrap_err();
    assert!(matches!(err, SessionError::Scoring(ScoringError::Parse { .. })));
    assert!(!session.is_scoring());
    assert_eq!(session.store().evaluations(), before.as_slice());

    // Reviews reloaded while the call was out: results for vanished ids are refused.
    let ticket = session.begin_scoring().unwrap();
    session.load_reviews(vec![Review::new("c", "t", 3)]).unwrap();
    let stale = vec![
        MachineScores::new("a", ScoreSet::zeroed(), JustificationSet::default()),
        MachineScores::new("b", ScoreSet::zeroed(), JustificationSet::default()),
    ];
    assert!(session.finish_scoring(ticket, Ok(stale)).is_err());
    assert!(!session.is_scoring());
}

#[tokio::test]
async fn simulated_scoring_then_analysis_records_history() {
    let mut session = Session::new();
    session
        .import_reviews(
            r#"[{"id": "a", "text": "Love it", "stars": 5},
                {"id": "b", "text": "Hate it", "stars": 1},
                {"id": "c", "text": "Fine", "stars": 3},
                {"id": "d", "text": "Slow", "stars": 2}]"#,
        )
        .unwrap();
    session.set_prompt("Rate the UX.").unwrap();

    let scored = session.run_scoring(&RandomScorer::seeded(42)).await.unwrap();
    assert_eq!(scored, 4);

    let analysis = session.analyze();
    assert_eq!(analysis.misaligned.len(), 3);
    assert_eq!(session.history().len(), 1);
    let entry = session.history().latest().unwrap();
    assert_eq!(entry.prompt(), "Rate the UX.");
    assert_eq!(entry.overall(), analysis.aggregate.overall);

    let worst = session.store().get(&analysis.misaligned[0]).unwrap().overall();
    for evaluation in session.store().evaluations() {
        assert!(worst <= evaluation.overall());
    }
}

#[test]
fn step_through_clamps_at_both_ends() {
    let mut session = Session::new();
    session
        .load_reviews(vec![
            Review::new("a", "t", 1),
            Review::new("b", "t", 2),
            Review::new("c", "t", 3),
        ])
        .unwrap();
    let store = session.store_mut();

    assert_eq!(store.step(Direction::Previous), 0);
    assert_eq!(store.step(Direction::Next), 1);
    assert_eq!(store.select_review(99), 2);
    assert_eq!(store.step(Direction::Next), 2);
    assert_eq!(store.current().unwrap().id(), "c");
}
