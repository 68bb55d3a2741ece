//! Ingestion of items from content sources.
//!
//! A source that fails to fetch is logged and skipped; the others still run.
//! Duplicate URLs are discarded without error.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::domain::{NewItem, SourceDescriptor, SourceItem};

use super::store::{Store, StoreError};

/// A producer of raw items
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Name and attributes of this source
    fn descriptor(&self) -> &SourceDescriptor;

    /// Fetch the current batch of items
    async fn fetch(&self) -> Result<SourceBatch>;
}

/// Items fetched from one source, plus the count of records it could not decode
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub items: Vec<SourceItem>,
    pub malformed: usize,
}

/// Items stored one JSON object per line
pub struct JsonlSource {
    descriptor: SourceDescriptor,
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(descriptor: SourceDescriptor, path: impl Into<PathBuf>) -> Self {
        Self {
            descriptor,
            path: path.into(),
        }
    }
}

#[async_trait]
impl ContentSource for JsonlSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self) -> Result<SourceBatch> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read source file: {}", self.path.display()))?;

        let mut batch = SourceBatch::default();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SourceItem>(line) {
                Ok(item) => batch.items.push(item),
                Err(e) => {
                    batch.malformed += 1;
                    warn!(
                        source = %self.descriptor.name,
                        line = idx + 1,
                        error = %e,
                        "Skipping malformed line"
                    );
                }
            }
        }

        Ok(batch)
    }
}

/// Summary of an ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub duplicates: usize,
    /// Items with no URL or no text
    pub discarded: usize,
    /// Records a source could not decode
    pub malformed: usize,
    pub failed_sources: Vec<String>,
}

/// Fetch every source in order and store new items with `scanned_at = now`
#[instrument(skip_all, fields(sources = sources.len()))]
pub async fn ingest(
    store: &Store,
    sources: &[Box<dyn ContentSource>],
    now: DateTime<Utc>,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for source in sources {
        let descriptor = source.descriptor();

        let batch = match source.fetch().await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(source = %descriptor.name, error = %e, "Source fetch failed, skipping");
                report.failed_sources.push(descriptor.name.clone());
                continue;
            }
        };

        let source_id = store
            .upsert_source(descriptor)
            .with_context(|| format!("Failed to register source {}", descriptor.name))?;

        let (mut inserted, mut duplicates, mut discarded) = (0, 0, 0);
        for raw in batch.items {
            let Some(item) = NewItem::from_source_item(source_id, raw) else {
                discarded += 1;
                continue;
            };

            match store.insert_item(&item, now) {
                Ok(_) => inserted += 1,
                Err(StoreError::DuplicateKey { url }) => {
                    debug!(%url, "Duplicate item ignored");
                    duplicates += 1;
                }
                Err(e) => return Err(e).context("Failed to store item"),
            }
        }

        store.touch_source(source_id, now)?;

        info!(
            source = %descriptor.name,
            inserted,
            duplicates,
            discarded,
            malformed = batch.malformed,
            "Source ingested"
        );
        report.inserted += inserted;
        report.duplicates += duplicates;
        report.discarded += discarded;
        report.malformed += batch.malformed;
    }

    Ok(report)
}
