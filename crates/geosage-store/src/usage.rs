//! Per-user usage counters. Additive upserts only; there is no delete path.

use rusqlite::{params, OptionalExtension};

use crate::sqlite::{db_err, now_millis, SqliteStore};
use crate::types::{UsageCounters, UsageDelta};
use geosage_core::Result;

impl SqliteStore {
    /// Add `delta` to the counters of `user_id`, creating the row on first use.
    pub fn add_usage(&self, user_id: &str, delta: &UsageDelta) -> Result<()> {
        if delta.is_zero() {
            return Ok(());
        }

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO location_users (user_id, cache_miss, cache_hit, invalid, ratelimit, \
             location_count, location_length, language_count, language_length, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(user_id) DO UPDATE SET \
             cache_miss = cache_miss + excluded.cache_miss, \
             cache_hit = cache_hit + excluded.cache_hit, \
             invalid = invalid + excluded.invalid, \
             ratelimit = ratelimit + excluded.ratelimit, \
             location_count = location_count + excluded.location_count, \
             location_length = location_length + excluded.location_length, \
             language_count = language_count + excluded.language_count, \
             language_length = language_length + excluded.language_length, \
             updated_at = excluded.updated_at",
        )
        .map_err(db_err)?
        .execute(params![
            user_id,
            delta.cache_miss as i64,
            delta.cache_hit as i64,
            delta.invalid as i64,
            delta.ratelimit as i64,
            delta.location_count as i64,
            delta.location_length as i64,
            delta.language_count as i64,
            delta.language_length as i64,
            now_millis(),
        ])
        .map_err(db_err)?;
        Ok(())
    }

    pub fn get_usage(&self, user_id: &str) -> Result<Option<UsageCounters>> {
        let conn = self.conn.lock();
        let usage = conn
            .prepare_cached(
                "SELECT user_id, cache_miss, cache_hit, invalid, ratelimit, location_count, \
                 location_length, language_count, language_length, updated_at \
                 FROM location_users WHERE user_id = ?1",
            )
            .map_err(db_err)?
            .query_row(params![user_id], |row| {
                Ok(UsageCounters {
                    user_id: row.get(0)?,
                    cache_miss: row.get::<_, i64>(1)? as u64,
                    cache_hit: row.get::<_, i64>(2)? as u64,
                    invalid: row.get::<_, i64>(3)? as u64,
                    ratelimit: row.get::<_, i64>(4)? as u64,
                    location_count: row.get::<_, i64>(5)? as u64,
                    location_length: row.get::<_, i64>(6)? as u64,
                    language_count: row.get::<_, i64>(7)? as u64,
                    language_length: row.get::<_, i64>(8)? as u64,
                    updated_at: row.get(9)?,
                })
            })
            .optional()
            .map_err(db_err)?;
        Ok(usage)
    }
}
