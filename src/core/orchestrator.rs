//! Generation orchestrator.
//!
//! Turns selected candidates into draft artifacts. Several candidates go out
//! as one batched request; if the reply does not split into exactly one
//! non-empty draft per candidate, each candidate is retried on its own,
//! strictly one after another. Failures of a single candidate are recorded
//! on that candidate and never stop its siblings.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{GenerationApi, GenerationRequest, DEFAULT_SYSTEM_PROMPT};
use crate::config::GenerationSettings;
use crate::domain::item::truncate_chars;
use crate::domain::{source_summary, ArtifactId, Candidate, CandidateId, CandidateStatus};

use super::sanitizer::Sanitizer;
use super::store::Store;

/// Body characters forwarded to the generation service per source
pub const SOURCE_BODY_CHARS: usize = 2000;

/// Longest error message stored on a candidate
pub const MAX_ERROR_CHARS: usize = 500;

/// Requests the orchestrator refuses before touching any candidate
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("No candidates requested")]
    NothingRequested,

    #[error("Candidate not found: {0}")]
    CandidateNotFound(CandidateId),

    #[error("Candidate {id} was already generated")]
    AlreadyGenerated {
        id: CandidateId,
        artifact_id: Option<ArtifactId>,
    },

    #[error("Candidate {id} cannot be generated while {status}")]
    InvalidState {
        id: CandidateId,
        status: CandidateStatus,
    },

    #[error("The item behind candidate {0} was rejected")]
    ItemRejected(CandidateId),
}

/// How a generation request was served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One candidate, one request
    Single,
    /// One request for all candidates, split cleanly
    Batched,
    /// Batch reply had the wrong shape; one request per candidate
    Fallback,
    /// The batch request itself failed; every candidate is in error
    BatchFailed,
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Single => "single",
            Self::Batched => "batched",
            Self::Fallback => "fallback",
            Self::BatchFailed => "batch_failed",
        };
        f.write_str(s)
    }
}

/// Result for one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    Generated { artifact_id: ArtifactId },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateOutcome {
    pub candidate_id: CandidateId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Summary of one `generate` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub mode: GenerationMode,
    /// One entry per requested candidate, in request order
    pub outcomes: Vec<CandidateOutcome>,
}

impl GenerationReport {
    pub fn generated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Generated { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.generated()
    }
}

/// Drives candidates through `generating` to `generated` or `error`
pub struct GenerationOrchestrator<'a> {
    store: &'a Store,
    api: &'a dyn GenerationApi,
    sanitizer: Sanitizer,
    system_prompt: String,
    delimiter: String,
}

impl<'a> GenerationOrchestrator<'a> {
    pub fn new(
        store: &'a Store,
        api: &'a dyn GenerationApi,
        settings: &GenerationSettings,
    ) -> Result<Self> {
        Ok(Self {
            store,
            api,
            sanitizer: Sanitizer::new().context("Failed to build sanitizer")?,
            system_prompt: settings
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            delimiter: settings.delimiter.clone(),
        })
    }

    /// Reset candidates left in `generating` by an interrupted session
    pub fn recover_stale_generations(&self) -> Result<usize> {
        let reset = self
            .store
            .reset_stale_generating()
            .context("Failed to reset stale generations")?;
        if reset > 0 {
            warn!(reset, "Reset candidates stuck in generating");
        }
        Ok(reset)
    }

    /// Generate drafts for the given candidates.
    ///
    /// Every id is validated before any candidate changes state. Generation
    /// failures become `error` candidates in the report. A store failure
    /// while recording an outcome is returned immediately; candidates not yet
    /// recorded stay `generating` until [`Self::recover_stale_generations`]
    /// runs at the start of the next session.
    #[instrument(skip(self), fields(api = %self.api.name()))]
    pub async fn generate(&self, ids: &[CandidateId]) -> Result<GenerationReport> {
        let candidates = self.validate(ids)?;

        for candidate in &candidates {
            self.store
                .transition_candidate(
                    candidate.id,
                    candidate.status,
                    CandidateStatus::Generating,
                    None,
                )
                .with_context(|| format!("Failed to start generation for {}", candidate.id))?;
        }

        let report = if candidates.len() == 1 {
            let outcome = self.generate_individual(&candidates[0]).await?;
            GenerationReport {
                mode: GenerationMode::Single,
                outcomes: vec![outcome],
            }
        } else {
            self.generate_batch(&candidates).await?
        };

        info!(
            mode = %report.mode,
            generated = report.generated(),
            failed = report.failed(),
            "Generation finished"
        );
        Ok(report)
    }

    fn validate(&self, ids: &[CandidateId]) -> Result<Vec<Candidate>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for &id in ids {
            if !seen.insert(id) {
                continue;
            }

            let candidate = self
                .store
                .get_candidate(id)?
                .ok_or(GenerationError::CandidateNotFound(id))?;

            if candidate.status == CandidateStatus::Generated {
                return Err(GenerationError::AlreadyGenerated {
                    id,
                    artifact_id: candidate.artifact_id,
                }
                .into());
            }
            if !candidate.status.can_transition_to(CandidateStatus::Generating) {
                return Err(GenerationError::InvalidState {
                    id,
                    status: candidate.status,
                }
                .into());
            }
            if self.store.is_user_rejected(candidate.item.id)? {
                return Err(GenerationError::ItemRejected(id).into());
            }

            candidates.push(candidate);
        }

        if candidates.is_empty() {
            return Err(GenerationError::NothingRequested.into());
        }
        Ok(candidates)
    }

    async fn generate_batch(&self, candidates: &[Candidate]) -> Result<GenerationReport> {
        let request = GenerationRequest::new(
            self.system_prompt.clone(),
            candidates.iter().map(source_text).collect(),
            self.delimiter.clone(),
        );

        let output = match self.api.generate(&request).await {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, count = candidates.len(), "Batch generation request failed");
                let message = format!("{:#}", e);
                let mut outcomes = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    outcomes.push(self.fail(candidate, &message)?);
                }
                return Ok(GenerationReport {
                    mode: GenerationMode::BatchFailed,
                    outcomes,
                });
            }
        };

        debug!(tokens = ?output.tokens_used, count = candidates.len(), "Batch reply received");
        let mut outcomes = Vec::with_capacity(candidates.len());

        match split_segments(&output.content, &self.delimiter, candidates.len()) {
            Some(segments) => {
                for (candidate, segment) in candidates.iter().zip(segments) {
                    outcomes.push(self.complete(candidate, segment)?);
                }
                Ok(GenerationReport {
                    mode: GenerationMode::Batched,
                    outcomes,
                })
            }
            None => {
                warn!(
                    expected = candidates.len(),
                    "Batch reply did not split into one draft per candidate, falling back"
                );
                for candidate in candidates {
                    outcomes.push(self.generate_individual(candidate).await?);
                }
                Ok(GenerationReport {
                    mode: GenerationMode::Fallback,
                    outcomes,
                })
            }
        }
    }

    async fn generate_individual(&self, candidate: &Candidate) -> Result<CandidateOutcome> {
        let request = GenerationRequest::new(
            self.system_prompt.clone(),
            vec![source_text(candidate)],
            self.delimiter.clone(),
        );

        match self.api.generate(&request).await {
            Ok(output) => {
                debug!(candidate = candidate.id, tokens = ?output.tokens_used, "Reply received");
                self.complete(candidate, &output.content)
            }
            Err(e) => {
                warn!(candidate = candidate.id, error = %e, "Generation failed");
                self.fail(candidate, &format!("{:#}", e))
            }
        }
    }

    /// Sanitize and store a draft, or fail the candidate if nothing is left
    fn complete(&self, candidate: &Candidate, raw: &str) -> Result<CandidateOutcome> {
        let body = self.sanitizer.sanitize(raw);
        if body.is_empty() {
            return self.fail(candidate, "generated text was empty after sanitizing");
        }

        let summary = source_summary(&candidate.item, &candidate.source_name);
        let artifact_id = self
            .store
            .complete_generation(candidate.id, candidate.item.id, &summary, &body, Utc::now())
            .with_context(|| format!("Failed to store draft for candidate {}", candidate.id))?;

        info!(candidate = candidate.id, artifact_id, "Draft stored");
        Ok(CandidateOutcome {
            candidate_id: candidate.id,
            outcome: Outcome::Generated { artifact_id },
        })
    }

    fn fail(&self, candidate: &Candidate, message: &str) -> Result<CandidateOutcome> {
        let message = truncate_chars(message, MAX_ERROR_CHARS);
        self.store
            .transition_candidate(
                candidate.id,
                CandidateStatus::Generating,
                CandidateStatus::Error,
                Some(message),
            )
            .with_context(|| format!("Failed to record error for candidate {}", candidate.id))?;

        Ok(CandidateOutcome {
            candidate_id: candidate.id,
            outcome: Outcome::Failed {
                message: message.to_string(),
            },
        })
    }
}

/// Source block sent to the generation service for one candidate
pub fn source_text(candidate: &Candidate) -> String {
    let item = &candidate.item;
    let author = item.author.as_deref().unwrap_or(&candidate.source_name);

    let mut body = truncate_chars(&item.body, SOURCE_BODY_CHARS).to_string();
    if body.len() < item.body.len() {
        body.push_str("...");
    }

    format!(
        "Author: {}\nPublication: {}\nTitle: {}\nURL: {}\n\n{}",
        author, candidate.source_name, item.title, item.url, body
    )
}

/// Split a batch reply into exactly `expected` non-empty drafts.
///
/// A delimiter at the very start or end of the reply is ignored. Returns
/// `None` on any other shape.
pub fn split_segments<'t>(content: &'t str, delimiter: &str, expected: usize) -> Option<Vec<&'t str>> {
    let mut content = content.trim();
    if let Some(rest) = content.strip_prefix(delimiter) {
        content = rest;
    }
    if let Some(rest) = content.strip_suffix(delimiter) {
        content = rest;
    }

    let segments: Vec<&str> = content.split(delimiter).map(str::trim).collect();
    if segments.len() != expected || segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIM: &str = "===DRAFT-BREAK===";

    #[test]
    fn test_split_exact_count() {
        let reply = format!("one\n{}\ntwo\n{}\nthree", DELIM, DELIM);
        assert_eq!(
            split_segments(&reply, DELIM, 3),
            Some(vec!["one", "two", "three"])
        );
    }

    #[test]
    fn test_split_tolerates_outer_delimiters() {
        let reply = format!("{}\none\n{}\ntwo\n{}\n", DELIM, DELIM, DELIM);
        assert_eq!(split_segments(&reply, DELIM, 2), Some(vec!["one", "two"]));
    }

    #[test]
    fn test_split_rejects_wrong_count() {
        let reply = format!("one\n{}\ntwo", DELIM);
        assert_eq!(split_segments(&reply, DELIM, 3), None);
    }

    #[test]
    fn test_split_rejects_empty_segment() {
        let reply = format!("one\n{}\n  \n{}\nthree", DELIM, DELIM);
        assert_eq!(split_segments(&reply, DELIM, 3), None);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(GenerationMode::BatchFailed.to_string(), "batch_failed");
        assert_eq!(
            serde_json::to_string(&GenerationMode::Fallback).unwrap(),
            "\"fallback\""
        );
    }
}
