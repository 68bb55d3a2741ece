//! Artifacts produced by the generation orchestrator.
//!
//! An artifact is the sanitized draft text derived from exactly one item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::{Item, ItemId};
use super::lifecycle::ArtifactStatus;

/// Row id of a generated artifact
pub type ArtifactId = i64;

/// A generated draft tied to one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub id: ArtifactId,
    pub item_id: ItemId,

    /// Title and URL of the item, joined in for display
    pub item_title: String,
    pub item_url: String,

    /// Attribution line for the source
    pub source_summary: String,

    /// Sanitized generated text
    pub body: String,

    pub status: ArtifactStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Build the attribution block stored alongside an artifact
pub fn source_summary(item: &Item, source_name: &str) -> String {
    let author = item
        .author
        .as_deref()
        .filter(|a| !a.is_empty())
        .unwrap_or(source_name);

    let mut summary = format!("Source: {} - {}", author, item.title);
    if !item.url.is_empty() {
        summary.push_str(&format!("\nLink: {}", item.url));
    }
    summary
}
