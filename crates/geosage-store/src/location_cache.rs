//! Write-through cache of geocoding lookups keyed by normalized query.
//!
//! Reading a query always records an access: the touch and the classification
//! happen in a single `UPDATE ... RETURNING` statement. Only fresh `ok` results
//! are ever written back, with insert-or-ignore semantics so concurrent writers
//! of the same query cannot conflict.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::sqlite::{db_err, now_millis, SqliteStore};
use crate::types::CacheStats;
use geosage_core::{relevance_for_rank, GeoResponse, GeoResult, GeoStatus, Result};

/// Storage width of the `country` column.
const COUNTRY_WIDTH: usize = 4;
/// Appended to country codes cut down to the storage width.
const TRUNCATION_MARK: char = '~';

impl SqliteStore {
    /// Look up cached results for `queries`, counting each lookup as an access.
    ///
    /// Every (trimmed) input query gets an entry: `cache_never` when flagged,
    /// `cache_hit` with candidates ordered by rank, `cache_miss` otherwise.
    pub fn read_locations<I, S>(&self, queries: I) -> Result<HashMap<String, GeoResult>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results = HashMap::new();
        let now = now_millis();
        let conn = self.conn.lock();

        for query in queries {
            let query = query.as_ref().trim();
            if results.contains_key(query) {
                continue;
            }

            let touched: Option<(i64, bool)> = conn
                .prepare_cached(
                    "UPDATE locations SET access_last = ?1, access_count = access_count + 1 \
                     WHERE query = ?2 RETURNING id, no_cache",
                )
                .map_err(db_err)?
                .query_row(params![now, query], |row| {
                    Ok((row.get(0)?, row.get::<_, i64>(1)? != 0))
                })
                .optional()
                .map_err(db_err)?;

            let result = match touched {
                Some((_, true)) => GeoResult::empty(GeoStatus::CacheNever),
                Some((location_id, false)) => {
                    let mut stmt = conn
                        .prepare_cached(
                            "SELECT pos, lat, lng, formatted, country, confidence FROM location_entries \
                             WHERE location_id = ?1 ORDER BY pos",
                        )
                        .map_err(db_err)?;
                    let rows = stmt
                        .query_map(params![location_id], |row| {
                            let pos: i64 = row.get(0)?;
                            Ok(GeoResponse {
                                lat: row.get(1)?,
                                lng: row.get(2)?,
                                formatted: row.get(3)?,
                                country: row.get(4)?,
                                relevance: relevance_for_rank(pos.max(0) as usize),
                                confidence: row.get(5)?,
                            })
                        })
                        .map_err(db_err)?;
                    let responses = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?;

                    if responses.is_empty() {
                        GeoResult::empty(GeoStatus::CacheMiss)
                    } else {
                        GeoResult::new(Some(responses), GeoStatus::CacheHit)
                    }
                }
                None => GeoResult::empty(GeoStatus::CacheMiss),
            };

            results.insert(query.to_string(), result);
        }

        debug!("Location cache read: {} queries", results.len());
        Ok(results)
    }

    /// Persist freshly resolved results. Entries whose status is not `ok` are skipped.
    pub fn write_locations(&self, results: &HashMap<String, GeoResult>) -> Result<usize> {
        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let mut written = 0;

        {
            let mut insert_location = tx
                .prepare_cached(
                    "INSERT INTO locations (query, access_last, access_count, no_cache) \
                     VALUES (?1, ?2, 1, 0) ON CONFLICT(query) DO NOTHING",
                )
                .map_err(db_err)?;
            let mut select_id = tx
                .prepare_cached("SELECT id FROM locations WHERE query = ?1")
                .map_err(db_err)?;
            let mut insert_entry = tx
                .prepare_cached(
                    "INSERT OR IGNORE INTO location_entries \
                     (location_id, pos, lat, lng, formatted, country, confidence) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(db_err)?;

            for (query, result) in results {
                if result.status != GeoStatus::Ok {
                    continue;
                }
                let Some(responses) = &result.responses else {
                    continue;
                };
                let query = query.trim();

                insert_location.execute(params![query, now]).map_err(db_err)?;
                let location_id: i64 = select_id
                    .query_row(params![query], |row| row.get(0))
                    .map_err(db_err)?;

                for (pos, response) in responses.iter().enumerate() {
                    insert_entry
                        .execute(params![
                            location_id,
                            pos as i64,
                            response.lat,
                            response.lng,
                            response.formatted,
                            storage_country(&response.country),
                            response.confidence,
                        ])
                        .map_err(db_err)?;
                }
                written += 1;
            }
        }

        tx.commit().map_err(db_err)?;
        if written > 0 {
            debug!("Location cache write: {} queries", written);
        }
        Ok(written)
    }

    /// Flag a query so it is never resolved live again.
    pub fn mark_never_cache(&self, query: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO locations (query, access_last, access_count, no_cache) \
             VALUES (?1, ?2, 0, 1) ON CONFLICT(query) DO UPDATE SET no_cache = 1",
            params![query.trim(), now_millis()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn cache_stats(&self) -> Result<CacheStats> {
        let (queries, never_cache, total_accesses, entries) = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(no_cache), 0), COALESCE(SUM(access_count), 0), \
                 (SELECT COUNT(*) FROM location_entries) FROM locations",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .map_err(db_err)?
        };

        Ok(CacheStats {
            queries,
            entries,
            never_cache,
            total_accesses,
            db_path: self.db_path().display().to_string(),
            db_size_mb: self.db_size_mb(),
        })
    }
}

/// Fit a country code into the storage width, marking truncated values.
fn storage_country(country: &str) -> String {
    if country.chars().count() > COUNTRY_WIDTH {
        let mut cut: String = country.chars().take(COUNTRY_WIDTH - 1).collect();
        cut.push(TRUNCATION_MARK);
        cut
    } else {
        country.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::tests::test_store;

    fn response(formatted: &str, country: &str, rank: usize) -> GeoResponse {
        GeoResponse {
            lat: 48.8566,
            lng: 2.3522,
            formatted: formatted.to_string(),
            country: country.to_string(),
            relevance: relevance_for_rank(rank),
            confidence: 9.0 - rank as f64,
        }
    }

    fn ok_result(query: &str, responses: Vec<GeoResponse>) -> HashMap<String, GeoResult> {
        HashMap::from([(
            query.to_string(),
            GeoResult::new(Some(responses), GeoStatus::Ok),
        )])
    }

    fn access_count(store: &SqliteStore, query: &str) -> i64 {
        store
            .conn
            .lock()
            .query_row(
                "SELECT access_count FROM locations WHERE query = ?1",
                params![query],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn test_read_unknown_queries_are_misses() {
        let (store, _dir) = test_store();
        let results = store.read_locations(["Paris", " Lyon "]).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results["Paris"].status, GeoStatus::CacheMiss);
        assert_eq!(results["Lyon"].status, GeoStatus::CacheMiss);
        assert!(results["Lyon"].responses.is_none());
    }

    #[test]
    fn test_write_then_read_hits_in_rank_order() {
        let (store, _dir) = test_store();
        let written = store
            .write_locations(&ok_result(
                "Paris",
                vec![
                    response("Paris, France", "FRA", 0),
                    response("Paris, Texas, USA", "USA", 1),
                ],
            ))
            .unwrap();
        assert_eq!(written, 1);

        let results = store.read_locations(["Paris"]).unwrap();
        let hit = &results["Paris"];
        assert_eq!(hit.status, GeoStatus::CacheHit);

        let responses = hit.responses.as_ref().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].country, "FRA");
        assert_eq!(responses[0].relevance, 1.0);
        assert_eq!(responses[1].formatted, "Paris, Texas, USA");
        assert_eq!(responses[1].relevance, 0.5);
        assert_eq!(responses[0].confidence, 9.0);
        assert_eq!(responses[1].confidence, 8.0);
    }

    #[test]
    fn test_write_is_idempotent() {
        let (store, _dir) = test_store();
        let results = ok_result("Berlin", vec![response("Berlin, Germany", "DEU", 0)]);

        store.write_locations(&results).unwrap();
        store.write_locations(&results).unwrap();

        let stats = store.cache_stats().unwrap();
        assert_eq!(stats.queries, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_write_skips_non_ok_statuses() {
        let (store, _dir) = test_store();
        let mut results = HashMap::new();
        for (query, status) in [
            ("a", GeoStatus::Invalid),
            ("b", GeoStatus::Ratelimit),
            ("c", GeoStatus::Requestlimit),
            ("d", GeoStatus::CacheNever),
        ] {
            results.insert(query.to_string(), GeoResult::empty(status));
        }
        results.insert(
            "e".to_string(),
            GeoResult::new(Some(vec![response("E", "FRA", 0)]), GeoStatus::CacheHit),
        );

        assert_eq!(store.write_locations(&results).unwrap(), 0);
        assert_eq!(store.cache_stats().unwrap().queries, 0);
    }

    #[test]
    fn test_read_counts_access_even_without_entries() {
        let (store, _dir) = test_store();
        store.mark_never_cache("Nowhere").unwrap();

        store.read_locations(["Nowhere"]).unwrap();
        store.read_locations(["Nowhere"]).unwrap();
        assert_eq!(access_count(&store, "Nowhere"), 2);
    }

    #[test]
    fn test_never_cache_wins_over_entries() {
        let (store, _dir) = test_store();
        store
            .write_locations(&ok_result("Springfield", vec![response("Springfield", "USA", 0)]))
            .unwrap();
        store.mark_never_cache("Springfield").unwrap();

        let results = store.read_locations(["Springfield"]).unwrap();
        assert_eq!(results["Springfield"].status, GeoStatus::CacheNever);
        assert!(results["Springfield"].responses.is_none());
    }

    #[test]
    fn test_long_country_codes_are_truncated() {
        let (store, _dir) = test_store();
        store
            .write_locations(&ok_result("Somewhere", vec![response("Somewhere", "ABCDEF", 0)]))
            .unwrap();

        let results = store.read_locations(["Somewhere"]).unwrap();
        let responses = results["Somewhere"].responses.as_ref().unwrap();
        assert_eq!(responses[0].country, "ABC~");
    }

    #[test]
    fn test_storage_country() {
        assert_eq!(storage_country("FRA"), "FRA");
        assert_eq!(storage_country("NUL"), "NUL");
        assert_eq!(storage_country("ABCD"), "ABCD");
        assert_eq!(storage_country("ABCDE"), "ABC~");
    }
}
