//! SQLite persistence for items, candidates, rejections and artifacts.
//!
//! The store is single-writer. Every multi-row write that readers must see
//! as a unit (candidate replacement, generation completion) runs inside one
//! transaction.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    ArtifactId, ArtifactStatus, Candidate, CandidateId, CandidateStatus, GeneratedArtifact, Item,
    ItemId, LifecycleError, NewItem, PoolEntry, RankingRun, Rejection, RejectionRecord,
    ScoreBreakdown, ScoredEntry, Source, SourceDescriptor, SourceId, UserRejection,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    url TEXT,
    category TEXT,
    priority INTEGER NOT NULL DEFAULT 5,
    last_scanned TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY,
    source_id INTEGER NOT NULL REFERENCES sources(id),
    url TEXT UNIQUE NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    author TEXT,
    published_at TEXT,
    scanned_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artifacts (
    id INTEGER PRIMARY KEY,
    item_id INTEGER NOT NULL REFERENCES items(id),
    source_summary TEXT NOT NULL,
    body TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    created_at TEXT NOT NULL,
    approved_at TEXT,
    posted_at TEXT
);

CREATE TABLE IF NOT EXISTS ranking_runs (
    id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    window_days INTEGER NOT NULL,
    top_n INTEGER NOT NULL,
    pool_size INTEGER NOT NULL,
    selected INTEGER NOT NULL,
    rejected INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS candidates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    item_id INTEGER NOT NULL REFERENCES items(id),
    rank INTEGER NOT NULL,
    recency REAL NOT NULL,
    substance REAL NOT NULL,
    authority REAL NOT NULL,
    engagement REAL NOT NULL,
    total REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'candidate',
    error_message TEXT,
    artifact_id INTEGER REFERENCES artifacts(id),
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rejections (
    id INTEGER PRIMARY KEY,
    run_id TEXT NOT NULL,
    item_id INTEGER NOT NULL REFERENCES items(id),
    recency REAL NOT NULL,
    substance REAL NOT NULL,
    authority REAL NOT NULL,
    engagement REAL NOT NULL,
    total REAL NOT NULL,
    reason TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_rejections (
    item_id INTEGER PRIMARY KEY REFERENCES items(id),
    rejected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_scanned ON items(scanned_at);
CREATE INDEX IF NOT EXISTS idx_artifacts_item ON artifacts(item_id);
CREATE INDEX IF NOT EXISTS idx_artifacts_status ON artifacts(status);
CREATE INDEX IF NOT EXISTS idx_rejections_run ON rejections(run_id);
"#;

const ITEM_COLUMNS: &str =
    "i.id, i.source_id, i.url, i.title, i.body, i.author, i.published_at, i.scanned_at";

const CANDIDATE_SELECT: &str = r#"
SELECT c.id, c.run_id, c.rank, c.recency, c.substance, c.authority, c.engagement,
       c.status, c.error_message, c.artifact_id, c.updated_at,
       i.id, i.source_id, i.url, i.title, i.body, i.author, i.published_at, i.scanned_at,
       s.name
FROM candidates c
JOIN items i ON i.id = c.item_id
JOIN sources s ON s.id = i.source_id
"#;

const ARTIFACT_SELECT: &str = r#"
SELECT a.id, a.item_id, i.title, i.url, a.source_summary, a.body, a.status,
       a.created_at, a.approved_at, a.posted_at
FROM artifacts a
JOIN items i ON i.id = a.item_id
"#;

/// Errors that can occur in the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate key: item with url {url} already exists")]
    DuplicateKey { url: String },

    #[error("Candidate not found: {0}")]
    CandidateNotFound(CandidateId),

    #[error("Candidate {id} is {actual}, expected {expected}")]
    StatusConflict {
        id: CandidateId,
        expected: CandidateStatus,
        actual: CandidateStatus,
    },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counts removed by a retention pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub rejections: usize,
    pub runs: usize,
    pub items: usize,
}

/// SQLite-backed persistent store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!(path = %path.display(), "Opened store");
        Self::init(conn)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ------------------------------------------------------------------
    // Sources and items
    // ------------------------------------------------------------------

    /// Insert a source or update its attributes, keyed by name
    pub fn upsert_source(&self, source: &SourceDescriptor) -> Result<SourceId, StoreError> {
        self.conn.execute(
            "INSERT INTO sources (name, url, category, priority, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                 url = COALESCE(excluded.url, sources.url),
                 category = COALESCE(excluded.category, sources.category),
                 priority = excluded.priority",
            params![
                source.name,
                source.url,
                source.category,
                source.priority as i64,
                ts(&Utc::now())
            ],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM sources WHERE name = ?1",
            params![source.name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Record that a source was just scanned
    pub fn touch_source(&self, id: SourceId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE sources SET last_scanned = ?1 WHERE id = ?2",
            params![ts(&at), id],
        )?;
        Ok(())
    }

    /// List all sources, highest priority first
    pub fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, url, category, priority, last_scanned
             FROM sources ORDER BY priority DESC, name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Source {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                category: row.get(3)?,
                priority: row.get::<_, i64>(4)? as u8,
                last_scanned: opt_ts_column(row, 5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert an item.
    ///
    /// Fails with [`StoreError::DuplicateKey`] when the URL is already stored;
    /// callers treat that as an expected no-op.
    pub fn insert_item(&self, item: &NewItem, scanned_at: DateTime<Utc>) -> Result<ItemId, StoreError> {
        let result = self.conn.execute(
            "INSERT INTO items (source_id, url, title, body, author, published_at, scanned_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.source_id,
                item.url,
                item.title,
                item.body,
                item.author,
                item.published_at.as_ref().map(ts),
                ts(&scanned_at)
            ],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == ErrorCode::ConstraintViolation
                    && msg.as_deref().map_or(false, |m| m.contains("items.url")) =>
            {
                Err(StoreError::DuplicateKey {
                    url: item.url.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of stored items
    pub fn item_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Look up an item by id
    pub fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let sql = format!("SELECT {} FROM items i WHERE i.id = ?1", ITEM_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], |row| item_from_row(row, 0))
            .optional()?)
    }

    /// Items scanned within `[from, to]` that have no artifact and were never
    /// rejected by a user, in insertion order.
    pub fn pool_entries(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PoolEntry>, StoreError> {
        let sql = format!(
            "SELECT {}, s.name, s.priority
             FROM items i
             JOIN sources s ON s.id = i.source_id
             WHERE i.scanned_at >= ?1 AND i.scanned_at <= ?2
               AND NOT EXISTS (SELECT 1 FROM artifacts a WHERE a.item_id = i.id)
               AND NOT EXISTS (SELECT 1 FROM user_rejections u WHERE u.item_id = i.id)
             ORDER BY i.id ASC",
            ITEM_COLUMNS
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![ts(&from), ts(&to)], |row| {
            Ok(PoolEntry {
                item: item_from_row(row, 0)?,
                source_name: row.get(8)?,
                source_priority: row.get::<_, i64>(9)? as u8,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ------------------------------------------------------------------
    // Ranking runs
    // ------------------------------------------------------------------

    /// Replace the live candidate set with `selected` and append the run's
    /// rejections and audit row, all in one transaction.
    pub fn commit_run(
        &self,
        run: &RankingRun,
        selected: &[ScoredEntry],
        rejections: &[Rejection],
    ) -> Result<(), StoreError> {
        let completed_at = run.completed_at.unwrap_or_else(Utc::now);
        let completed = ts(&completed_at);
        let run_id = run.id.to_string();

        let tx = self.conn.unchecked_transaction()?;

        let replaced = tx.execute("DELETE FROM candidates", [])?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO candidates
                     (run_id, item_id, rank, recency, substance, authority, engagement, total,
                      status, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (idx, scored) in selected.iter().enumerate() {
                let s = &scored.score;
                insert.execute(params![
                    run_id,
                    scored.item_id(),
                    (idx + 1) as i64,
                    s.recency,
                    s.substance,
                    s.authority,
                    s.engagement,
                    s.total(),
                    CandidateStatus::Candidate.as_str(),
                    completed
                ])?;
            }
        }

        {
            let mut insert = tx.prepare(
                "INSERT INTO rejections
                     (run_id, item_id, recency, substance, authority, engagement, total, reason,
                      created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for rejection in rejections {
                let s = &rejection.scored.score;
                insert.execute(params![
                    run_id,
                    rejection.scored.item_id(),
                    s.recency,
                    s.substance,
                    s.authority,
                    s.engagement,
                    s.total(),
                    rejection.reason.to_string(),
                    completed
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO ranking_runs
                 (id, started_at, completed_at, window_days, top_n, pool_size, selected, rejected)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                ts(&run.started_at),
                completed,
                run.window_days as i64,
                run.top_n as i64,
                run.pool_size as i64,
                run.selected as i64,
                run.rejected as i64
            ],
        )?;

        tx.commit()?;

        info!(
            run_id = %run.id,
            replaced,
            selected = selected.len(),
            rejected = rejections.len(),
            "Candidate set replaced"
        );
        Ok(())
    }

    /// Most recent ranking runs first
    pub fn list_runs(&self, limit: usize) -> Result<Vec<RankingRun>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, completed_at, window_days, top_n, pool_size, selected, rejected
             FROM ranking_runs ORDER BY completed_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RankingRun {
                id: parse_column(0, &row.get::<_, String>(0)?)?,
                started_at: ts_column(row, 1)?,
                completed_at: Some(ts_column(row, 2)?),
                window_days: row.get::<_, i64>(3)? as u32,
                top_n: row.get::<_, i64>(4)? as usize,
                pool_size: row.get::<_, i64>(5)? as usize,
                selected: row.get::<_, i64>(6)? as usize,
                rejected: row.get::<_, i64>(7)? as usize,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ------------------------------------------------------------------
    // Candidates
    // ------------------------------------------------------------------

    /// Live candidates in rank order, hiding items a user has rejected
    pub fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let sql = format!(
            "{} WHERE NOT EXISTS (SELECT 1 FROM user_rejections u WHERE u.item_id = c.item_id)
             ORDER BY c.rank ASC",
            CANDIDATE_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], candidate_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Look up a live candidate by id
    pub fn get_candidate(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError> {
        let sql = format!("{} WHERE c.id = ?1", CANDIDATE_SELECT);
        Ok(self
            .conn
            .query_row(&sql, params![id], candidate_from_row)
            .optional()?)
    }

    /// Move a candidate from `expected` to `next`.
    ///
    /// The update is compare-and-set: it only applies while the stored status
    /// still equals `expected`.
    pub fn transition_candidate(
        &self,
        id: CandidateId,
        expected: CandidateStatus,
        next: CandidateStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        expected.transition(next)?;

        let updated = self.conn.execute(
            "UPDATE candidates SET status = ?1, error_message = ?2, updated_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                next.as_str(),
                error_message,
                ts(&Utc::now()),
                id,
                expected.as_str()
            ],
        )?;

        if updated == 0 {
            return Err(self.conflict_for(id, expected));
        }
        Ok(())
    }

    /// Reset candidates stuck in `generating` back to `candidate`
    pub fn reset_stale_generating(&self) -> Result<usize, StoreError> {
        let reset = self.conn.execute(
            "UPDATE candidates SET status = ?1, error_message = NULL, updated_at = ?2
             WHERE status = ?3",
            params![
                CandidateStatus::Candidate.as_str(),
                ts(&Utc::now()),
                CandidateStatus::Generating.as_str()
            ],
        )?;
        Ok(reset)
    }

    /// Store a draft artifact for a `generating` candidate and mark it
    /// `generated`, in one transaction.
    pub fn complete_generation(
        &self,
        candidate_id: CandidateId,
        item_id: ItemId,
        source_summary: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<ArtifactId, StoreError> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO artifacts (item_id, source_summary, body, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                item_id,
                source_summary,
                body,
                ArtifactStatus::Draft.as_str(),
                ts(&at)
            ],
        )?;
        let artifact_id = tx.last_insert_rowid();

        let updated = tx.execute(
            "UPDATE candidates SET status = ?1, artifact_id = ?2, error_message = NULL,
                 updated_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                CandidateStatus::Generated.as_str(),
                artifact_id,
                ts(&at),
                candidate_id,
                CandidateStatus::Generating.as_str()
            ],
        )?;

        if updated == 0 {
            drop(tx);
            return Err(self.conflict_for(candidate_id, CandidateStatus::Generating));
        }

        tx.commit()?;
        Ok(artifact_id)
    }

    fn conflict_for(&self, id: CandidateId, expected: CandidateStatus) -> StoreError {
        let actual = self
            .conn
            .query_row(
                "SELECT status FROM candidates WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional();

        match actual {
            Ok(Some(raw)) => match raw.parse::<CandidateStatus>() {
                Ok(actual) => StoreError::StatusConflict {
                    id,
                    expected,
                    actual,
                },
                Err(e) => e.into(),
            },
            Ok(None) => StoreError::CandidateNotFound(id),
            Err(e) => e.into(),
        }
    }

    // ------------------------------------------------------------------
    // Artifacts
    // ------------------------------------------------------------------

    /// Set an artifact's status, stamping approval/posting times.
    ///
    /// Returns `false` when no artifact has this id.
    pub fn set_artifact_status(
        &self,
        id: ArtifactId,
        status: ArtifactStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let stamp = ts(&at);
        let updated = match status {
            ArtifactStatus::Approved => self.conn.execute(
                "UPDATE artifacts SET status = ?1, approved_at = ?2 WHERE id = ?3",
                params![status.as_str(), stamp, id],
            )?,
            ArtifactStatus::Posted => self.conn.execute(
                "UPDATE artifacts SET status = ?1, posted_at = ?2 WHERE id = ?3",
                params![status.as_str(), stamp, id],
            )?,
            ArtifactStatus::Draft | ArtifactStatus::Rejected => self.conn.execute(
                "UPDATE artifacts SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )?,
        };
        Ok(updated > 0)
    }

    /// Look up an artifact by id
    pub fn get_artifact(&self, id: ArtifactId) -> Result<Option<GeneratedArtifact>, StoreError> {
        let sql = format!("{} WHERE a.id = ?1", ARTIFACT_SELECT);
        Ok(self
            .conn
            .query_row(&sql, params![id], artifact_from_row)
            .optional()?)
    }

    /// Newest artifacts first, optionally filtered by status
    pub fn list_artifacts(
        &self,
        status: Option<ArtifactStatus>,
        limit: usize,
    ) -> Result<Vec<GeneratedArtifact>, StoreError> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR a.status = ?1) ORDER BY a.created_at DESC, a.id DESC LIMIT ?2",
            ARTIFACT_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![status.map(|s| s.as_str()), limit as i64],
            artifact_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ------------------------------------------------------------------
    // Rejections
    // ------------------------------------------------------------------

    /// Permanently exclude an item from future pools.
    ///
    /// Returns `false` if the item was already rejected.
    pub fn reject_item(&self, item_id: ItemId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO user_rejections (item_id, rejected_at) VALUES (?1, ?2)",
            params![item_id, ts(&at)],
        )?;
        Ok(inserted > 0)
    }

    /// Check whether a user has rejected this item
    pub fn is_user_rejected(&self, item_id: ItemId) -> Result<bool, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM user_rejections WHERE item_id = ?1")?;
        Ok(stmt.exists(params![item_id])?)
    }

    /// Most recent user rejections first
    pub fn list_user_rejections(&self, limit: usize) -> Result<Vec<UserRejection>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT u.item_id, i.url, i.title, u.rejected_at
             FROM user_rejections u JOIN items i ON i.id = u.item_id
             ORDER BY u.rejected_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(UserRejection {
                item_id: row.get(0)?,
                url: row.get(1)?,
                title: row.get(2)?,
                rejected_at: ts_column(row, 3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Most recent rejection log entries first
    pub fn list_rejections(&self, limit: usize) -> Result<Vec<RejectionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.run_id, r.item_id, i.url, i.title,
                    r.recency, r.substance, r.authority, r.engagement, r.reason, r.created_at
             FROM rejections r JOIN items i ON i.id = r.item_id
             ORDER BY r.id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RejectionRecord {
                id: row.get(0)?,
                run_id: parse_column::<Uuid>(1, &row.get::<_, String>(1)?)?,
                item_id: row.get(2)?,
                url: row.get(3)?,
                title: row.get(4)?,
                score: score_columns(row, 5)?,
                reason: row.get(9)?,
                created_at: ts_column(row, 10)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Delete audit rows and unreferenced items older than `cutoff`.
    ///
    /// Items that carry an artifact, a live candidate, a rejection record or
    /// a user rejection are kept.
    pub fn prune(&self, cutoff: DateTime<Utc>) -> Result<PruneReport, StoreError> {
        let cutoff = ts(&cutoff);
        let tx = self.conn.unchecked_transaction()?;

        let rejections = tx.execute(
            "DELETE FROM rejections WHERE created_at < ?1",
            params![cutoff],
        )?;
        let runs = tx.execute(
            "DELETE FROM ranking_runs
             WHERE completed_at < ?1 AND id NOT IN (SELECT DISTINCT run_id FROM candidates)",
            params![cutoff],
        )?;
        let items = tx.execute(
            "DELETE FROM items
             WHERE scanned_at < ?1
               AND NOT EXISTS (SELECT 1 FROM artifacts a WHERE a.item_id = items.id)
               AND NOT EXISTS (SELECT 1 FROM candidates c WHERE c.item_id = items.id)
               AND NOT EXISTS (SELECT 1 FROM rejections r WHERE r.item_id = items.id)
               AND NOT EXISTS (SELECT 1 FROM user_rejections u WHERE u.item_id = items.id)",
            params![cutoff],
        )?;

        tx.commit()?;
        Ok(PruneReport {
            rejections,
            runs,
            items,
        })
    }
}

/// Fixed-width RFC 3339 timestamp, so text comparison orders chronologically
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    parse_column(idx, &row.get::<_, String>(idx)?)
}

fn opt_ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_column(idx, &raw))
        .transpose()
}

fn score_columns(row: &Row<'_>, offset: usize) -> rusqlite::Result<ScoreBreakdown> {
    Ok(ScoreBreakdown {
        recency: row.get(offset)?,
        substance: row.get(offset + 1)?,
        authority: row.get(offset + 2)?,
        engagement: row.get(offset + 3)?,
    })
}

fn item_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(offset)?,
        source_id: row.get(offset + 1)?,
        url: row.get(offset + 2)?,
        title: row.get(offset + 3)?,
        body: row.get(offset + 4)?,
        author: row.get(offset + 5)?,
        published_at: opt_ts_column(row, offset + 6)?,
        scanned_at: ts_column(row, offset + 7)?,
    })
}

fn candidate_from_row(row: &Row<'_>) -> rusqlite::Result<Candidate> {
    Ok(Candidate {
        id: row.get(0)?,
        run_id: parse_column(1, &row.get::<_, String>(1)?)?,
        rank: row.get::<_, i64>(2)? as u32,
        score: score_columns(row, 3)?,
        status: parse_column(7, &row.get::<_, String>(7)?)?,
        error_message: row.get(8)?,
        artifact_id: row.get(9)?,
        updated_at: ts_column(row, 10)?,
        item: item_from_row(row, 11)?,
        source_name: row.get(19)?,
    })
}

fn artifact_from_row(row: &Row<'_>) -> rusqlite::Result<GeneratedArtifact> {
    Ok(GeneratedArtifact {
        id: row.get(0)?,
        item_id: row.get(1)?,
        item_title: row.get(2)?,
        item_url: row.get(3)?,
        source_summary: row.get(4)?,
        body: row.get(5)?,
        status: parse_column(6, &row.get::<_, String>(6)?)?,
        created_at: ts_column(row, 7)?,
        approved_at: opt_ts_column(row, 8)?,
        posted_at: opt_ts_column(row, 9)?,
    })
}
