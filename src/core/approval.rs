//! Operator commands for reviewing candidates and drafts.

use anyhow::{Context, Result};
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{
    ArtifactId, ArtifactStatus, Candidate, CandidateId, GeneratedArtifact, RankingRun,
    RejectionRecord, UserRejection,
};

use super::orchestrator::{GenerationOrchestrator, GenerationReport};
use super::store::Store;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("Candidate not found: {0}")]
    CandidateNotFound(CandidateId),
}

/// Result of an artifact status update.
///
/// Unknown ids are accepted without error and reported as [`StatusUpdate::UnknownId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Updated,
    UnknownId,
}

/// Current candidates with their scores, best first
pub fn list_candidates(store: &Store) -> Result<Vec<Candidate>> {
    Ok(store.list_candidates()?)
}

/// Generate a draft for one candidate
pub async fn trigger_generation(
    orchestrator: &GenerationOrchestrator<'_>,
    candidate_id: CandidateId,
) -> Result<GenerationReport> {
    orchestrator.generate(&[candidate_id]).await
}

/// Permanently exclude the candidate's item from future pools
pub fn reject_candidate(store: &Store, candidate_id: CandidateId) -> Result<UserRejection> {
    let candidate = store
        .get_candidate(candidate_id)?
        .ok_or(ApprovalError::CandidateNotFound(candidate_id))?;

    let now = Utc::now();
    let inserted = store
        .reject_item(candidate.item.id, now)
        .context("Failed to record rejection")?;

    if inserted {
        info!(candidate = candidate_id, item = candidate.item.id, "Item rejected");
    } else {
        info!(candidate = candidate_id, item = candidate.item.id, "Item was already rejected");
    }

    Ok(UserRejection {
        item_id: candidate.item.id,
        url: candidate.item.url,
        title: candidate.item.title,
        rejected_at: now,
    })
}

/// Set an artifact's status. An unknown id changes nothing.
pub fn set_artifact_status(
    store: &Store,
    artifact_id: ArtifactId,
    status: ArtifactStatus,
) -> Result<StatusUpdate> {
    let updated = store
        .set_artifact_status(artifact_id, status, Utc::now())
        .context("Failed to update artifact status")?;

    if updated {
        info!(artifact_id, %status, "Artifact status updated");
        Ok(StatusUpdate::Updated)
    } else {
        warn!(artifact_id, %status, "No artifact with this id, nothing updated");
        Ok(StatusUpdate::UnknownId)
    }
}

pub fn list_artifacts(
    store: &Store,
    status: Option<ArtifactStatus>,
    limit: usize,
) -> Result<Vec<GeneratedArtifact>> {
    Ok(store.list_artifacts(status, limit)?)
}

pub fn list_drafts(store: &Store, limit: usize) -> Result<Vec<GeneratedArtifact>> {
    list_artifacts(store, Some(ArtifactStatus::Draft), limit)
}

pub fn list_rejections(store: &Store, limit: usize) -> Result<Vec<RejectionRecord>> {
    Ok(store.list_rejections(limit)?)
}

pub fn list_user_rejections(store: &Store, limit: usize) -> Result<Vec<UserRejection>> {
    Ok(store.list_user_rejections(limit)?)
}

pub fn list_runs(store: &Store, limit: usize) -> Result<Vec<RankingRun>> {
    Ok(store.list_runs(limit)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_artifact_is_reported() {
        let store = Store::open_in_memory().unwrap();
        let update = set_artifact_status(&store, 404, ArtifactStatus::Posted).unwrap();
        assert_eq!(update, StatusUpdate::UnknownId);
    }

    #[test]
    fn test_reject_unknown_candidate() {
        let store = Store::open_in_memory().unwrap();
        let err = reject_candidate(&store, 9).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ApprovalError>(),
            Some(&ApprovalError::CandidateNotFound(9))
        );
    }
}
