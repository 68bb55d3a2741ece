//! Core pipeline logic.
//!
//! This module contains:
//! - Store: SQLite persistence
//! - Ingest: content sources and ingestion runs
//! - Pool, Scorer, Dedup, Selector: one ranking run
//! - Sanitizer: cleanup of generated text
//! - Orchestrator: draft generation with batch fallback
//! - Approval: operator commands

pub mod approval;
pub mod dedup;
pub mod ingest;
pub mod orchestrator;
pub mod pool;
pub mod sanitizer;
pub mod scorer;
pub mod selector;
pub mod store;

// Re-export commonly used types
pub use approval::{ApprovalError, StatusUpdate};
pub use dedup::{deduplicate, DedupConfig};
pub use ingest::{ingest, ContentSource, IngestReport, JsonlSource, SourceBatch};
pub use orchestrator::{
    CandidateOutcome, GenerationError, GenerationMode, GenerationOrchestrator, GenerationReport,
    Outcome,
};
pub use sanitizer::Sanitizer;
pub use scorer::Scorer;
pub use selector::{rank, select, Ranker, Ranking};
pub use store::{PruneReport, Store, StoreError};
