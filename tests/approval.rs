//! Approval Integration Tests
//!
//! Operator commands against an on-disk store: rejection, status updates,
//! read views and retention.

mod common;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use common::{run_ranker, seed, ScriptedApi, DELIM};
use draftline::config::GenerationSettings;
use draftline::core::approval::{self, StatusUpdate};
use draftline::core::{GenerationOrchestrator, Outcome, Store};
use draftline::domain::{ArtifactId, ArtifactStatus};

fn open(temp: &TempDir) -> Store {
    Store::open(&temp.path().join("state").join("draftline.db")).unwrap()
}

async fn generate_one(store: &Store) -> ArtifactId {
    let candidate = approval::list_candidates(store).unwrap().remove(0);
    let api = ScriptedApi::new(vec![Ok("A measured take on the news.")]);
    let settings = GenerationSettings {
        delimiter: DELIM.to_string(),
        ..GenerationSettings::default()
    };
    let orchestrator = GenerationOrchestrator::new(store, &api, &settings).unwrap();

    let report = approval::trigger_generation(&orchestrator, candidate.id)
        .await
        .unwrap();
    match report.outcomes[0].outcome {
        Outcome::Generated { artifact_id } => artifact_id,
        ref other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_store_persists_across_reopen() {
    let temp = TempDir::new().unwrap();
    let now = Utc::now();

    {
        let store = open(&temp);
        seed(&store, 3, now);
        run_ranker(&store, 20, now);
    }

    let store = open(&temp);
    assert_eq!(store.item_count().unwrap(), 3);
    assert_eq!(approval::list_candidates(&store).unwrap().len(), 3);
    assert_eq!(approval::list_runs(&store, 5).unwrap().len(), 1);
}

#[test]
fn test_reject_candidate_hides_item() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp);
    let now = Utc::now();
    seed(&store, 3, now);
    run_ranker(&store, 20, now);

    let target = approval::list_candidates(&store).unwrap().remove(1);
    let rejection = approval::reject_candidate(&store, target.id).unwrap();

    assert_eq!(rejection.item_id, target.item.id);
    assert_eq!(approval::list_candidates(&store).unwrap().len(), 2);

    let user_rejections = approval::list_user_rejections(&store, 10).unwrap();
    assert_eq!(user_rejections.len(), 1);
    assert_eq!(user_rejections[0].url, target.item.url);

    // Rejecting twice is harmless
    approval::reject_candidate(&store, target.id).unwrap();
    assert_eq!(approval::list_user_rejections(&store, 10).unwrap().len(), 1);

    let run = run_ranker(&store, 20, now);
    assert_eq!(run.pool_size, 2);
}

#[tokio::test]
async fn test_status_updates_stamp_times() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp);
    let now = Utc::now();
    seed(&store, 1, now);
    run_ranker(&store, 20, now);

    let artifact_id = generate_one(&store).await;
    assert_eq!(approval::list_drafts(&store, 10).unwrap().len(), 1);

    let update = approval::set_artifact_status(&store, artifact_id, ArtifactStatus::Approved).unwrap();
    assert_eq!(update, StatusUpdate::Updated);

    let artifact = store.get_artifact(artifact_id).unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Approved);
    assert!(artifact.approved_at.is_some());
    assert!(artifact.posted_at.is_none());

    approval::set_artifact_status(&store, artifact_id, ArtifactStatus::Posted).unwrap();
    let artifact = store.get_artifact(artifact_id).unwrap().unwrap();
    assert!(artifact.posted_at.is_some());

    // Any status may follow any other
    approval::set_artifact_status(&store, artifact_id, ArtifactStatus::Draft).unwrap();
    assert!(approval::list_drafts(&store, 10).unwrap().iter().any(|a| a.id == artifact_id));

    let posted = approval::list_artifacts(&store, Some(ArtifactStatus::Posted), 10).unwrap();
    assert!(posted.is_empty());
}

#[test]
fn test_unknown_artifact_is_noop() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp);

    let update = approval::set_artifact_status(&store, 12345, ArtifactStatus::Approved).unwrap();

    assert_eq!(update, StatusUpdate::UnknownId);
    assert!(approval::list_artifacts(&store, None, 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_prune_keeps_referenced_items() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp);
    let long_ago = Utc::now() - Duration::days(60);

    seed(&store, 3, long_ago);
    // A cutoff at 2 leaves one rejection record
    run_ranker(&store, 2, long_ago);
    generate_one(&store).await;

    // A fresh run on an empty window leaves no live candidates
    run_ranker(&store, 20, Utc::now());

    let report = store.prune(Utc::now() + Duration::days(1)).unwrap();

    assert_eq!(report.rejections, 1);
    assert_eq!(report.runs, 2);
    // The generated item is kept, the other two go
    assert_eq!(report.items, 2);
    assert_eq!(store.item_count().unwrap(), 1);
    assert_eq!(approval::list_drafts(&store, 10).unwrap().len(), 1);
}

#[test]
fn test_prune_spares_recent_rows() {
    let temp = TempDir::new().unwrap();
    let store = open(&temp);
    let now = Utc::now();
    seed(&store, 3, now);
    run_ranker(&store, 2, now);

    let report = store.prune(now - Duration::days(30)).unwrap();

    assert_eq!(report.rejections, 0);
    assert_eq!(report.runs, 0);
    assert_eq!(report.items, 0);
    assert_eq!(store.item_count().unwrap(), 3);
}
