//! Pool assembly: the rolling window of items eligible for ranking.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::PoolEntry;

use super::store::{Store, StoreError};

/// Items ingested within `window_days` of `now`, minus generated and
/// user-rejected items, in insertion order.
///
/// A window reaching past the earliest representable time covers everything.
pub fn assemble(
    store: &Store,
    now: DateTime<Utc>,
    window_days: u32,
) -> Result<Vec<PoolEntry>, StoreError> {
    let from = now
        .checked_sub_signed(Duration::days(i64::from(window_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let pool = store.pool_entries(from, now)?;
    debug!(window_days, size = pool.len(), "Pool assembled");
    Ok(pool)
}
