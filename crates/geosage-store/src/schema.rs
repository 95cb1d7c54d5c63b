//! Database schema SQL for the location cache and usage tables.

/// Cached geocoding queries, one row per normalized query.
pub const LOCATIONS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL UNIQUE,
    access_last INTEGER NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    no_cache INTEGER NOT NULL DEFAULT 0
);
"#;

/// Ranked candidates of a cached query; `pos` is the provider rank starting at 0.
pub const LOCATION_ENTRIES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS location_entries (
    location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
    pos INTEGER NOT NULL,
    lat REAL NOT NULL,
    lng REAL NOT NULL,
    formatted TEXT NOT NULL,
    country VARCHAR(4) NOT NULL,
    confidence REAL NOT NULL,
    PRIMARY KEY (location_id, pos)
);

CREATE INDEX IF NOT EXISTS idx_location_entries_country ON location_entries(country);
"#;

/// Per-user usage counters, only ever incremented.
pub const LOCATION_USERS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS location_users (
    user_id TEXT PRIMARY KEY,
    cache_miss INTEGER NOT NULL DEFAULT 0,
    cache_hit INTEGER NOT NULL DEFAULT 0,
    invalid INTEGER NOT NULL DEFAULT 0,
    ratelimit INTEGER NOT NULL DEFAULT 0,
    location_count INTEGER NOT NULL DEFAULT 0,
    location_length INTEGER NOT NULL DEFAULT 0,
    language_count INTEGER NOT NULL DEFAULT 0,
    language_length INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);
"#;
