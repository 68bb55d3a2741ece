//! draftline - ranked candidate pipeline with human-approved drafts
//!
//! Items arrive from content sources, are scored and deduplicated, and the
//! best of them become candidates. An operator picks candidates, a language
//! model drafts a post for each, and the drafts go through approval.
//!
//! # Architecture
//!
//! - Ingestion inserts items, silently discarding duplicate URLs
//! - A ranking run scores the rolling pool and replaces the candidate set
//! - Generation batches candidates into one request, falling back to
//!   one request per candidate when the reply is malformed
//! - Every draft is sanitized before it is stored
//!
//! # Modules
//!
//! - `adapters`: Generation API integrations (Anthropic)
//! - `core`: Store, scoring, ranking, generation, approval
//! - `domain`: Data structures (Item, Candidate, Artifact, statuses)
//! - `config`: File and environment configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Load items and rank them
//! draftline ingest --file feed.jsonl --priority 8
//! draftline rank
//!
//! # Review and draft
//! draftline candidates
//! draftline generate 3 5 8
//! draftline drafts
//! draftline set-status 12 approved
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{AdapterOutput, AnthropicAdapter, GenerationApi, GenerationRequest};
pub use config::ResolvedConfig;
pub use core::{
    GenerationMode, GenerationOrchestrator, GenerationReport, Ranker, Scorer, Store, StoreError,
};
pub use domain::{
    ArtifactStatus, Candidate, CandidateStatus, GeneratedArtifact, Item, RankingRun,
    ScoreBreakdown,
};
