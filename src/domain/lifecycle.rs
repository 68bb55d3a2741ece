//! Status enums and the transitions allowed between them.
//!
//! Candidates move `candidate -> generating -> {generated | error}`, with
//! `error -> generating` on an explicit retry and `generating -> candidate`
//! when a stale session is recovered. Artifacts may move between any two
//! statuses; the core only ever creates them as `draft`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by lifecycle rules
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Unknown candidate status: {0}")]
    UnknownCandidateStatus(String),

    #[error("Unknown artifact status: {0}")]
    UnknownArtifactStatus(String),

    #[error("Invalid candidate transition: {from} → {to}")]
    InvalidTransition {
        from: CandidateStatus,
        to: CandidateStatus,
    },
}

/// Generation status of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    /// Ranked, waiting for an operator
    Candidate,

    /// A generation request is in flight
    Generating,

    /// A draft artifact exists
    Generated,

    /// The last generation attempt failed
    Error,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Generating => "generating",
            Self::Generated => "generated",
            Self::Error => "error",
        }
    }

    /// Check whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: CandidateStatus) -> bool {
        use CandidateStatus::*;
        matches!(
            (self, next),
            (Candidate, Generating)
                | (Error, Generating)
                | (Generating, Generated)
                | (Generating, Error)
                | (Generating, Candidate)
        )
    }

    /// Validate `self -> next`, returning the new status
    pub fn transition(self, next: CandidateStatus) -> Result<CandidateStatus, LifecycleError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LifecycleError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl Default for CandidateStatus {
    fn default() -> Self {
        Self::Candidate
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(Self::Candidate),
            "generating" => Ok(Self::Generating),
            "generated" => Ok(Self::Generated),
            "error" => Ok(Self::Error),
            other => Err(LifecycleError::UnknownCandidateStatus(other.to_string())),
        }
    }
}

/// Review status of a generated artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Draft,
    Approved,
    Posted,
    Rejected,
}

impl ArtifactStatus {
    pub const ALL: [ArtifactStatus; 4] = [
        ArtifactStatus::Draft,
        ArtifactStatus::Approved,
        ArtifactStatus::Posted,
        ArtifactStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Posted => "posted",
            Self::Rejected => "rejected",
        }
    }
}

impl Default for ArtifactStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ArtifactStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "approved" => Ok(Self::Approved),
            "posted" => Ok(Self::Posted),
            "rejected" => Ok(Self::Rejected),
            other => Err(LifecycleError::UnknownArtifactStatus(other.to_string())),
        }
    }
}
