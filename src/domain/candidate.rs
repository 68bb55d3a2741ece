//! Ranked candidates and the records of items that did not make the cut.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifact::ArtifactId;
use super::item::{Item, ItemId, PoolEntry};
use super::lifecycle::CandidateStatus;
use super::score::ScoreBreakdown;

/// Row id of a candidate
pub type CandidateId = i64;

/// A pool entry with its computed score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: PoolEntry,
    pub score: ScoreBreakdown,
}

impl ScoredEntry {
    pub fn total(&self) -> f64 {
        self.score.total()
    }

    pub fn item_id(&self) -> ItemId {
        self.entry.item.id
    }

    pub fn url(&self) -> &str {
        &self.entry.item.url
    }
}

/// Why an item was left out of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RejectionReason {
    /// Ranked below the top-N cutoff
    BelowCutoff { top_n: usize },

    /// Body prefix too similar to a higher-scoring item
    NearDuplicate { of_url: String },

    /// Same URL as an item earlier in the batch
    DuplicateUrl,

    /// Scored zero on every component
    NoSignal,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowCutoff { top_n } => write!(f, "below cutoff (top {})", top_n),
            Self::NearDuplicate { of_url } => {
                write!(f, "near-duplicate of higher-scoring item {}", of_url)
            }
            Self::DuplicateUrl => f.write_str("duplicate url"),
            Self::NoSignal => f.write_str("no scoring signal"),
        }
    }
}

/// An excluded item before it is written to the rejection log
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub scored: ScoredEntry,
    pub reason: RejectionReason,
}

/// A live candidate of the current ranking run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub run_id: Uuid,

    /// 1-based position in the run
    pub rank: u32,

    pub item: Item,
    pub source_name: String,
    pub score: ScoreBreakdown,
    pub status: CandidateStatus,

    /// Set while the status is `error`
    pub error_message: Option<String>,

    /// Set once the status is `generated`
    pub artifact_id: Option<ArtifactId>,

    pub updated_at: DateTime<Utc>,
}

/// An entry of the append-only rejection log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub id: i64,
    pub run_id: Uuid,
    pub item_id: ItemId,
    pub url: String,
    pub title: String,
    pub score: ScoreBreakdown,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// A permanent, operator-issued exclusion of an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRejection {
    pub item_id: ItemId,
    pub url: String,
    pub title: String,
    pub rejected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reason_text() {
        assert_eq!(
            RejectionReason::BelowCutoff { top_n: 20 }.to_string(),
            "below cutoff (top 20)"
        );
        assert_eq!(
            RejectionReason::NearDuplicate {
                of_url: "https://a.example/1".to_string()
            }
            .to_string(),
            "near-duplicate of higher-scoring item https://a.example/1"
        );
        assert_eq!(RejectionReason::NoSignal.to_string(), "no scoring signal");
    }
}
