//! Selection of the top-N candidates and bookkeeping for everything else.
//!
//! [`rank`] is the pure part of a run: score, sort, deduplicate, cut.
//! [`Ranker`] wraps it with pool assembly and the store commit.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::config::PipelineConfig;
use crate::domain::{PoolEntry, RankingRun, Rejection, RejectionReason, ScoredEntry};

use super::dedup::{deduplicate, DedupConfig};
use super::pool;
use super::scorer::Scorer;
use super::store::Store;

/// Outcome of ranking one batch
#[derive(Debug, Default)]
pub struct Ranking {
    /// Selected entries, best first
    pub selected: Vec<ScoredEntry>,
    pub rejected: Vec<Rejection>,
}

/// Stable sort, best total first; equal totals keep their input order
pub fn sort_by_total(batch: &mut [ScoredEntry]) {
    batch.sort_by(|a, b| b.total().total_cmp(&a.total()));
}

/// Split a sorted, deduplicated batch into the top `top_n` and the rest.
///
/// Entries with no scoring signal at all are never selected.
pub fn select(batch: Vec<ScoredEntry>, top_n: usize) -> Ranking {
    let mut ranking = Ranking::default();

    for scored in batch {
        if scored.total() <= 0.0 {
            ranking.rejected.push(Rejection {
                scored,
                reason: RejectionReason::NoSignal,
            });
        } else if ranking.selected.len() < top_n {
            ranking.selected.push(scored);
        } else {
            ranking.rejected.push(Rejection {
                scored,
                reason: RejectionReason::BelowCutoff { top_n },
            });
        }
    }

    ranking
}

/// Score, sort, deduplicate and select a pool
pub fn rank(
    pool: Vec<PoolEntry>,
    scorer: &Scorer,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Ranking {
    let mut scored: Vec<ScoredEntry> = pool
        .into_iter()
        .map(|entry| {
            let score = scorer.score(&entry, now);
            ScoredEntry { entry, score }
        })
        .collect();

    sort_by_total(&mut scored);

    let dedup = deduplicate(
        scored,
        DedupConfig {
            threshold: config.similarity_threshold,
            prefix_chars: config.similarity_prefix_chars,
        },
    );

    let mut ranking = select(dedup.kept, config.top_n);
    let mut rejected = dedup.rejected;
    rejected.append(&mut ranking.rejected);
    ranking.rejected = rejected;
    ranking
}

/// Executes whole ranking runs against the store
pub struct Ranker<'a> {
    store: &'a Store,
    scorer: &'a Scorer,
    config: PipelineConfig,
}

impl<'a> Ranker<'a> {
    pub fn new(store: &'a Store, scorer: &'a Scorer, config: PipelineConfig) -> Self {
        Self {
            store,
            scorer,
            config,
        }
    }

    /// Run one ranking pass as of `now` and replace the live candidate set.
    ///
    /// Nothing is written unless the whole run succeeds.
    #[instrument(skip(self), fields(top_n = self.config.top_n, window_days = self.config.window_days))]
    pub fn run(&self, now: DateTime<Utc>) -> Result<RankingRun> {
        let mut run = RankingRun::new(now, self.config.window_days, self.config.top_n);

        let pool = pool::assemble(self.store, now, self.config.window_days)
            .context("Failed to assemble candidate pool")?;
        run.pool_size = pool.len();

        let ranking = rank(pool, self.scorer, &self.config, now);
        run.selected = ranking.selected.len();
        run.rejected = ranking.rejected.len();
        run.completed_at = Some(Utc::now());

        self.store
            .commit_run(&run, &ranking.selected, &ranking.rejected)
            .context("Failed to replace candidate set")?;

        info!(
            run_id = %run.id,
            pool = run.pool_size,
            selected = run.selected,
            rejected = run.rejected,
            "Ranking run complete"
        );
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Item, ScoreBreakdown};

    fn scored(id: i64, total: f64) -> ScoredEntry {
        ScoredEntry {
            entry: PoolEntry {
                item: Item {
                    id,
                    source_id: 1,
                    url: format!("https://a.example/{}", id),
                    title: String::new(),
                    body: String::new(),
                    author: None,
                    published_at: None,
                    scanned_at: Utc::now(),
                },
                source_name: "S".to_string(),
                source_priority: 1,
            },
            score: ScoreBreakdown {
                authority: total,
                ..ScoreBreakdown::default()
            },
        }
    }

    fn ids(entries: &[ScoredEntry]) -> Vec<i64> {
        entries.iter().map(ScoredEntry::item_id).collect()
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut batch = vec![scored(1, 10.0), scored(2, 20.0), scored(3, 10.0), scored(4, 20.0)];
        sort_by_total(&mut batch);
        assert_eq!(ids(&batch), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_select_cuts_at_top_n() {
        let ranking = select(vec![scored(1, 30.0), scored(2, 20.0), scored(3, 10.0)], 2);

        assert_eq!(ids(&ranking.selected), vec![1, 2]);
        assert_eq!(ranking.rejected.len(), 1);
        assert_eq!(ranking.rejected[0].reason, RejectionReason::BelowCutoff { top_n: 2 });
    }

    #[test]
    fn test_zero_total_is_never_selected() {
        let ranking = select(vec![scored(1, 4.0), scored(2, 0.0)], 20);

        assert_eq!(ids(&ranking.selected), vec![1]);
        assert_eq!(ranking.rejected[0].reason, RejectionReason::NoSignal);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let batch = || vec![scored(5, 12.0), scored(6, 12.0), scored(7, 18.0), scored(8, 2.0)];

        let mut first = batch();
        sort_by_total(&mut first);
        let mut second = batch();
        sort_by_total(&mut second);

        assert_eq!(ids(&select(first, 3).selected), ids(&select(second, 3).selected));
    }
}
