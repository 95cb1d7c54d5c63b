//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::Language;

pub const DEFAULT_PORT: u16 = 3010;
pub const DEFAULT_OPENCAGE_URL: &str = "https://api.opencagedata.com";
pub const DEFAULT_NER_URL: &str = "http://127.0.0.1:8500/ner";
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Paths to all GeoSage data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            root,
        };
        std::fs::create_dir_all(&paths.db)?;
        Ok(paths)
    }
}

/// Top-level GeoSage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoSageConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// OpenCage API key; live geocoding is unavailable without one.
    #[serde(skip_serializing)]
    pub opencage_api_key: Option<String>,
    pub opencage_url: String,
    /// Inference engine endpoint serving the NER profiles.
    pub ner_url: String,
    /// Languages with a loaded NER profile.
    pub ner_languages: Vec<Language>,
    /// Budget applied when a request leaves `max_requests` unset.
    pub default_max_requests: Option<usize>,
    /// Sleep between rate-limited attempts when the provider gives no reset time.
    pub retry_delay: Duration,
}

impl GeoSageConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT: {}", p)))?,
            Err(_) => DEFAULT_PORT,
        };

        let ner_languages = match std::env::var("NER_LANGUAGES") {
            Ok(list) => parse_languages(&list)?,
            Err(_) => vec![Language::En, Language::Xx],
        };

        let default_max_requests = match std::env::var("GEOSAGE_MAX_REQUESTS") {
            Ok(n) => Some(
                n.parse()
                    .map_err(|_| Error::Config(format!("invalid GEOSAGE_MAX_REQUESTS: {}", n)))?,
            ),
            Err(_) => None,
        };

        let retry_delay_ms = match std::env::var("GEOSAGE_RETRY_DELAY_MS") {
            Ok(ms) => ms
                .parse()
                .map_err(|_| Error::Config(format!("invalid GEOSAGE_RETRY_DELAY_MS: {}", ms)))?,
            Err(_) => DEFAULT_RETRY_DELAY_MS,
        };

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            opencage_api_key: std::env::var("OPENCAGE_API_KEY").ok().filter(|k| !k.is_empty()),
            opencage_url: std::env::var("OPENCAGE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENCAGE_URL.to_string()),
            ner_url: std::env::var("NER_URL").unwrap_or_else(|_| DEFAULT_NER_URL.to_string()),
            ner_languages,
            default_max_requests,
            retry_delay: Duration::from_millis(retry_delay_ms),
        })
    }
}

/// Parse a comma-separated language list such as `en,de,xx`.
pub fn parse_languages(list: &str) -> Result<Vec<Language>> {
    let mut languages = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let language: Language = part.parse()?;
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    Ok(languages)
}
