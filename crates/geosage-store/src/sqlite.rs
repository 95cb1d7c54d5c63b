//! SQLite connection management and schema bootstrap.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::info;

use crate::schema::{LOCATIONS_SQL, LOCATION_ENTRIES_SQL, LOCATION_USERS_SQL};
use geosage_core::{Error, Result};

/// SQLite store holding the location cache and the usage counters.
pub struct SqliteStore {
    pub(crate) conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the SQLite store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/geosage.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("geosage.db");

        let conn = Self::create_connection(&db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        store.create_location_tables()?;

        let stats = store.cache_stats()?;
        info!(
            "SqliteStore initialized: {} cached queries, {} entries, path={}",
            stats.queries,
            stats.entries,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    /// Create the cache, cache-entry and usage tables. Safe to call repeatedly.
    pub fn create_location_tables(&self) -> Result<()> {
        let full_schema = format!(
            "{}\n{}\n{}",
            LOCATIONS_SQL, LOCATION_ENTRIES_SQL, LOCATION_USERS_SQL
        );
        self.conn
            .lock()
            .execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn db_size_mb(&self) -> f64 {
        std::fs::metadata(&self.db_path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0)
    }
}

pub(crate) fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_open_creates_db_file() {
        let (store, dir) = test_store();
        assert!(dir.path().join("geosage.db").exists());
        assert_eq!(store.db_path(), dir.path().join("geosage.db"));
    }

    #[test]
    fn test_create_location_tables_is_idempotent() {
        let (store, _dir) = test_store();
        store.create_location_tables().unwrap();
        store.create_location_tables().unwrap();

        let conn = store.conn.lock();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('locations', 'location_entries', 'location_users')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteStore::open(dir.path()).unwrap();
            store.mark_never_cache("Atlantis").unwrap();
        }
        let store = SqliteStore::open(dir.path()).unwrap();
        assert_eq!(store.cache_stats().unwrap().never_cache, 1);
    }
}
