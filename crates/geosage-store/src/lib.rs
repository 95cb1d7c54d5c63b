//! GeoSage Store — SQLite location cache and per-user usage accounting.

pub mod location_cache;
pub mod schema;
pub mod sqlite;
pub mod types;
pub mod usage;

pub use sqlite::SqliteStore;
pub use types::*;
