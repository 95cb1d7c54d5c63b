//! Data types for usage accounting and cache statistics.

use serde::{Deserialize, Serialize};

/// Increments applied to a user's usage counters in one upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDelta {
    pub cache_miss: u64,
    pub cache_hit: u64,
    pub invalid: u64,
    pub ratelimit: u64,
    pub location_count: u64,
    pub location_length: u64,
    pub language_count: u64,
    pub language_length: u64,
}

impl UsageDelta {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Accumulated usage counters of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCounters {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "cacheMiss")]
    pub cache_miss: u64,
    #[serde(rename = "cacheHit")]
    pub cache_hit: u64,
    pub invalid: u64,
    pub ratelimit: u64,
    #[serde(rename = "locationCount")]
    pub location_count: u64,
    #[serde(rename = "locationLength")]
    pub location_length: u64,
    #[serde(rename = "languageCount")]
    pub language_count: u64,
    #[serde(rename = "languageLength")]
    pub language_length: u64,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

/// Location cache statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub queries: i64,
    pub entries: i64,
    #[serde(rename = "neverCache")]
    pub never_cache: i64,
    #[serde(rename = "totalAccesses")]
    pub total_accesses: i64,
    #[serde(rename = "dbPath")]
    pub db_path: String,
    #[serde(rename = "dbSizeMb")]
    pub db_size_mb: f64,
}
