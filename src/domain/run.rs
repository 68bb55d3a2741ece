//! Ranking run summary.
//!
//! A run is one pass of pool assembly, scoring, deduplication and selection.
//! Only completed runs are recorded; a failed run leaves no trace and the
//! previous candidate set stays live.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit record of a completed ranking run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRun {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Reference time the pool window was computed from
    pub started_at: DateTime<Utc>,

    /// When the candidate set was replaced
    pub completed_at: Option<DateTime<Utc>>,

    /// Pool window in days
    pub window_days: u32,

    /// Selection size requested
    pub top_n: usize,

    /// Items in the assembled pool
    pub pool_size: usize,

    /// Items promoted to candidates
    pub selected: usize,

    /// Items written to the rejection log
    pub rejected: usize,
}

impl RankingRun {
    /// Start a new run at `started_at`
    pub fn new(started_at: DateTime<Utc>, window_days: u32, top_n: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            completed_at: None,
            window_days,
            top_n,
            pool_size: 0,
            selected: 0,
            rejected: 0,
        }
    }
}
