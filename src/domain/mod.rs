//! Domain types for the draftline pipeline.
//!
//! This module contains the core data structures:
//! - Item: ingested content and its source
//! - Score: the four-part score breakdown
//! - Candidate: ranked items, rejection records, user rejections
//! - Artifact: generated drafts
//! - Lifecycle: status enums and their transitions
//! - Run: ranking run audit record

pub mod artifact;
pub mod candidate;
pub mod item;
pub mod lifecycle;
pub mod run;
pub mod score;

// Re-export commonly used types
pub use artifact::{source_summary, ArtifactId, GeneratedArtifact};
pub use candidate::{
    Candidate, CandidateId, Rejection, RejectionReason, RejectionRecord, ScoredEntry,
    UserRejection,
};
pub use item::{
    Item, ItemId, NewItem, PoolEntry, Source, SourceDescriptor, SourceId, SourceItem,
};
pub use lifecycle::{ArtifactStatus, CandidateStatus, LifecycleError};
pub use run::RankingRun;
pub use score::ScoreBreakdown;
