//! Ingested items and the sources they come from.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Row id of an ingested item
pub type ItemId = i64;

/// Row id of a source
pub type SourceId = i64;

/// Maximum stored body length, in characters
pub const MAX_BODY_CHARS: usize = 5000;

/// Lowest and highest source priority
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// Priority assumed when a source does not declare one
pub const DEFAULT_PRIORITY: u8 = 5;

/// Description of a content source, as declared by the source itself or config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Unique source name
    pub name: String,

    /// Feed or homepage URL (informational)
    pub url: Option<String>,

    /// Free-form category label
    pub category: Option<String>,

    /// Authority of the source, 1..=10
    pub priority: u8,
}

impl SourceDescriptor {
    /// Create a descriptor, clamping the priority into range
    pub fn new(name: impl Into<String>, priority: u8) -> Self {
        Self {
            name: name.into(),
            url: None,
            category: None,
            priority: clamp_priority(priority),
        }
    }
}

/// Clamp a priority into `MIN_PRIORITY..=MAX_PRIORITY`
pub fn clamp_priority(priority: u8) -> u8 {
    priority.clamp(MIN_PRIORITY, MAX_PRIORITY)
}

/// A stored source row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub url: Option<String>,
    pub category: Option<String>,
    pub priority: u8,
    pub last_scanned: Option<DateTime<Utc>>,
}

/// Raw item as yielded by a content source, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    pub url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, alias = "content")]
    pub body: String,

    #[serde(default)]
    pub author: Option<String>,

    /// Publication date as the source wrote it; parsed leniently on validation
    #[serde(default)]
    pub published_at: Option<String>,
}

/// Parse a publication date in any of the formats feeds commonly use.
///
/// Accepts RFC 3339, RFC 2822, and naive date-times or plain dates, which
/// are taken as UTC. Returns `None` for anything else.
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A validated item ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub source_id: SourceId,
    pub url: String,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewItem {
    /// Validate a raw source item.
    ///
    /// Returns `None` when the URL is empty or there is neither a title nor a body.
    /// The body is capped at [`MAX_BODY_CHARS`]. An unreadable publication date
    /// is dropped and the item kept undated.
    pub fn from_source_item(source_id: SourceId, raw: SourceItem) -> Option<Self> {
        let url = raw.url.trim().to_string();
        let title = raw.title.trim().to_string();
        let body = truncate_chars(raw.body.trim(), MAX_BODY_CHARS).to_string();

        if url.is_empty() || (title.is_empty() && body.is_empty()) {
            return None;
        }

        let author = raw
            .author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let published_at = raw.published_at.as_deref().and_then(|value| {
            let parsed = parse_published_at(value);
            if parsed.is_none() && !value.trim().is_empty() {
                debug!(%url, published_at = value, "Unreadable publication date, item kept undated");
            }
            parsed
        });

        Some(Self {
            source_id,
            url,
            title,
            body,
            author,
            published_at,
        })
    }
}

/// A stored item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub source_id: SourceId,
    pub url: String,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,

    /// Ingestion time, used for pool windowing
    pub scanned_at: DateTime<Utc>,
}

/// An item joined with the source attributes the scorer needs
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub item: Item,
    pub source_name: String,
    pub source_priority: u8,
}

/// Take at most `max_chars` characters of `s`
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
