//! Ranking Integration Tests
//!
//! Ingestion dedup, pool assembly, scoring, selection and the
//! replace-on-write candidate set, against an in-memory store.

mod common;

use chrono::{DateTime, Duration, Utc};

use common::{item, run_ranker, seed};
use draftline::config::ScoringConfig;
use draftline::core::{Scorer, Store, StoreError};
use draftline::domain::{
    CandidateStatus, Item, PoolEntry, RankingRun, Rejection, RejectionReason, ScoreBreakdown,
    ScoredEntry, SourceDescriptor,
};

fn fixture_entry(published_at: Option<DateTime<Utc>>, priority: u8) -> PoolEntry {
    let body = format!(
        "Revenue grew to $5B, up 12% since 2024. The CEO said \"we expect steady growth\". {}",
        "data ".repeat(300)
    );
    PoolEntry {
        item: Item {
            id: 1,
            source_id: 1,
            url: "https://news.example/results".to_string(),
            title: "Quarterly results".to_string(),
            body,
            author: None,
            published_at,
            scanned_at: Utc::now(),
        },
        source_name: "Wire".to_string(),
        source_priority: priority,
    }
}

#[test]
fn test_fixture_scores_exact_total() {
    let scorer = Scorer::new(&ScoringConfig::default(), 180).unwrap();
    let now = Utc::now();

    let score = scorer.score(&fixture_entry(Some(now), 10), now);

    assert_eq!(score.recency, 30.0);
    assert_eq!(score.substance, 25.0);
    assert_eq!(score.authority, 20.0);
    assert_eq!(score.engagement, 0.0);
    assert_eq!(score.total(), 75.0);
}

#[test]
fn test_undated_item_gets_no_recency() {
    let scorer = Scorer::new(&ScoringConfig::default(), 180).unwrap();
    let score = scorer.score(&fixture_entry(None, 10), Utc::now());

    assert_eq!(score.recency, 0.0);
    assert_eq!(score.substance, 25.0);
}

#[test]
fn test_duplicate_url_insert_is_noop() {
    let store = Store::open_in_memory().unwrap();
    let source_id = store.upsert_source(&SourceDescriptor::new("S", 5)).unwrap();
    let now = Utc::now();

    store
        .insert_item(&item(source_id, "https://a.example/1", "One", "Body"), now)
        .unwrap();
    let second = store.insert_item(&item(source_id, "https://a.example/1", "Two", "Other"), now);

    assert!(matches!(second, Err(StoreError::DuplicateKey { .. })));
    assert_eq!(store.item_count().unwrap(), 1);
}

#[test]
fn test_near_duplicates_leave_one_survivor() {
    let store = Store::open_in_memory().unwrap();
    let source_id = store.upsert_source(&SourceDescriptor::new("S", 5)).unwrap();
    let now = Utc::now();

    let body = "Regulators approved the merger of two regional payment networks after a long review.";
    let rewrite = "Regulators approved the merger of two regional payment networks after a lengthy review.";
    store
        .insert_item(&item(source_id, "https://a.example/1", "Merger", body), now)
        .unwrap();
    store
        .insert_item(&item(source_id, "https://b.example/2", "Merger", rewrite), now)
        .unwrap();

    let run = run_ranker(&store, 20, now);

    assert_eq!(run.pool_size, 2);
    assert_eq!(run.selected, 1);
    assert_eq!(store.list_candidates().unwrap().len(), 1);

    let rejections = store.list_rejections(10).unwrap();
    assert_eq!(rejections.len(), 1);
    assert!(rejections[0].reason.starts_with("near-duplicate of higher-scoring item"));
}

#[test]
fn test_top_n_cut_records_rejections() {
    let store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    seed(&store, 5, now);

    let run = run_ranker(&store, 3, now);

    assert_eq!(run.selected, 3);
    assert_eq!(run.rejected, 2);

    let candidates = store.list_candidates().unwrap();
    let ranks: Vec<u32> = candidates.iter().map(|c| c.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    for pair in candidates.windows(2) {
        assert!(pair[0].score.total() >= pair[1].score.total());
    }

    let rejections = store.list_rejections(10).unwrap();
    assert!(rejections.iter().all(|r| r.reason == "below cutoff (top 3)"));
}

#[test]
fn test_ranking_twice_yields_same_order() {
    let store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    seed(&store, 5, now);

    run_ranker(&store, 4, now);
    let first: Vec<i64> = store.list_candidates().unwrap().iter().map(|c| c.item.id).collect();

    run_ranker(&store, 4, now);
    let second: Vec<i64> = store.list_candidates().unwrap().iter().map(|c| c.item.id).collect();

    assert_eq!(first, second);
}

#[test]
fn test_latest_run_replaces_candidates() {
    let store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    seed(&store, 3, now);

    let run1 = run_ranker(&store, 20, now);
    let run2 = run_ranker(&store, 20, now);

    let candidates = store.list_candidates().unwrap();
    assert_eq!(candidates.len(), 3);
    assert!(candidates.iter().all(|c| c.run_id == run2.id));
    assert!(candidates.iter().all(|c| c.run_id != run1.id));

    let runs = store.list_runs(10).unwrap();
    assert_eq!(runs.len(), 2);
}

#[test]
fn test_empty_pool_clears_candidates() {
    let store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    seed(&store, 2, now);
    run_ranker(&store, 20, now);
    assert_eq!(store.list_candidates().unwrap().len(), 2);

    // Ten days later everything has aged out of the window
    let run = run_ranker(&store, 20, now + Duration::days(10));

    assert_eq!(run.pool_size, 0);
    assert_eq!(run.selected, 0);
    assert!(store.list_candidates().unwrap().is_empty());
}

#[test]
fn test_user_rejected_item_never_returns() {
    let store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    let ids = seed(&store, 3, now);

    run_ranker(&store, 20, now);
    let target = store
        .list_candidates()
        .unwrap()
        .into_iter()
        .find(|c| c.item.id == ids[1])
        .unwrap();

    store.reject_item(target.item.id, now).unwrap();

    // Hidden from the live list right away
    assert!(store.list_candidates().unwrap().iter().all(|c| c.item.id != ids[1]));

    // And from every later pool
    for days in 0..3 {
        let at = now + Duration::hours(days * 12);
        run_ranker(&store, 20, at);
        let pool = store.pool_entries(at - Duration::days(5), at).unwrap();
        assert!(pool.iter().all(|e| e.item.id != ids[1]));
    }
}

#[test]
fn test_generated_item_leaves_pool() {
    let store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    seed(&store, 2, now);
    run_ranker(&store, 20, now);

    let candidate = store.list_candidates().unwrap().remove(0);
    store
        .transition_candidate(
            candidate.id,
            CandidateStatus::Candidate,
            CandidateStatus::Generating,
            None,
        )
        .unwrap();
    store
        .complete_generation(candidate.id, candidate.item.id, "Source: x", "Draft", now)
        .unwrap();

    let run = run_ranker(&store, 20, now);
    assert_eq!(run.pool_size, 1);
}

#[test]
fn test_failed_commit_keeps_previous_candidates() {
    let store = Store::open_in_memory().unwrap();
    let now = Utc::now();
    seed(&store, 3, now);

    run_ranker(&store, 20, now);
    let before: Vec<i64> = store.list_candidates().unwrap().iter().map(|c| c.id).collect();

    // Rejection pointing at an item that does not exist breaks the foreign key
    // after the old candidates have already been deleted inside the transaction
    let mut ghost = fixture_entry(Some(now), 5);
    ghost.item.id = 9999;
    let rejection = Rejection {
        scored: ScoredEntry {
            entry: ghost,
            score: ScoreBreakdown::default(),
        },
        reason: RejectionReason::BelowCutoff { top_n: 1 },
    };
    let mut run = RankingRun::new(now, 5, 1);
    run.completed_at = Some(now);

    let result = store.commit_run(&run, &[], &[rejection]);

    assert!(result.is_err());
    let after: Vec<i64> = store.list_candidates().unwrap().iter().map(|c| c.id).collect();
    assert_eq!(after, before);
    assert_eq!(store.list_runs(10).unwrap().len(), 1);
    assert!(store.list_rejections(10).unwrap().is_empty());
}
