//! Geocoding data model shared by the store, the resolver and the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Country sentinel used when no country could be attributed.
pub const NUL_COUNTRY: &str = "NUL";

/// Language profile selecting the NER model for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    De,
    Fr,
    Es,
    It,
    Nl,
    /// Multilingual profile.
    Xx,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
            Self::Fr => "fr",
            Self::Es => "es",
            Self::It => "it",
            Self::Nl => "nl",
            Self::Xx => "xx",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Self::En),
            "de" => Ok(Self::De),
            "fr" => Ok(Self::Fr),
            "es" => Ok(Self::Es),
            "it" => Ok(Self::It),
            "nl" => Ok(Self::Nl),
            "xx" => Ok(Self::Xx),
            other => Err(Error::Config(format!("unknown language: {}", other))),
        }
    }
}

/// Policy choosing one geocoding candidate per query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Highest-ranked candidate of each query.
    #[default]
    Top,
    /// Relevance penalized by document-wide country frequency.
    Frequency,
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Self::Top),
            "frequency" => Ok(Self::Frequency),
            other => Err(Error::Config(format!("unknown strategy: {}", other))),
        }
    }
}

/// How a single query's result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoStatus {
    Ok,
    CacheHit,
    CacheMiss,
    CacheNever,
    Invalid,
    Ratelimit,
    Requestlimit,
}

impl GeoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::CacheHit => "cache_hit",
            Self::CacheMiss => "cache_miss",
            Self::CacheNever => "cache_never",
            Self::Invalid => "invalid",
            Self::Ratelimit => "ratelimit",
            Self::Requestlimit => "requestlimit",
        }
    }
}

impl fmt::Display for GeoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One geocoded candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResponse {
    pub lat: f64,
    pub lng: f64,
    pub formatted: String,
    /// ISO 3166-1 alpha-3 code, or [`NUL_COUNTRY`].
    pub country: String,
    /// `1 / (rank + 1)` with rank 0-based in provider order.
    pub relevance: f64,
    /// Provider-reported precision score, 0 when unknown.
    #[serde(default)]
    pub confidence: f64,
}

/// Relevance of the candidate at 0-based `rank`.
pub fn relevance_for_rank(rank: usize) -> f64 {
    1.0 / (rank as f64 + 1.0)
}

/// Outcome of resolving one normalized query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResult {
    pub responses: Option<Vec<GeoResponse>>,
    pub status: GeoStatus,
}

impl GeoResult {
    pub fn new(responses: Option<Vec<GeoResponse>>, status: GeoStatus) -> Self {
        Self { responses, status }
    }

    /// A result carrying no candidates.
    pub fn empty(status: GeoStatus) -> Self {
        Self {
            responses: None,
            status,
        }
    }

    pub fn has_candidates(&self) -> bool {
        self.responses.is_some()
    }
}

/// A location extraction request.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoQuery {
    pub input: String,
    #[serde(default)]
    pub return_input: bool,
    #[serde(default)]
    pub return_context: bool,
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default = "default_language")]
    pub language: Language,
    #[serde(default)]
    pub max_requests: Option<usize>,
}

fn default_language() -> Language {
    Language::En
}

impl GeoQuery {
    /// Query with default options for `input`.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            return_input: false,
            return_context: false,
            strategy: StrategyKind::Top,
            language: Language::En,
            max_requests: None,
        }
    }
}

/// Aggregated mentions of one distinct entity text within a document.
#[derive(Debug, Clone, Serialize)]
pub struct EntityInfo {
    pub query: String,
    pub spans: Vec<(usize, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<String>>,
    pub location: Option<GeoResponse>,
    pub count: usize,
    pub status: GeoStatus,
}

/// Document-level extraction result.
#[derive(Debug, Clone, Serialize)]
pub struct GeoOutput {
    pub status: GeoStatus,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub entities: Vec<EntityInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_strictly_decreasing() {
        assert_eq!(relevance_for_rank(0), 1.0);
        assert_eq!(relevance_for_rank(1), 0.5);
        assert!(relevance_for_rank(2) < relevance_for_rank(1));
    }

    #[test]
    fn test_unknown_strategy_is_config_error() {
        assert_eq!("top".parse::<StrategyKind>().unwrap(), StrategyKind::Top);
        assert_eq!(
            "frequency".parse::<StrategyKind>().unwrap(),
            StrategyKind::Frequency
        );
        assert!(matches!(
            "nearest".parse::<StrategyKind>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_query_defaults() {
        let query: GeoQuery = serde_json::from_str(r#"{"input": "Berlin"}"#).unwrap();
        assert_eq!(query.strategy, StrategyKind::Top);
        assert_eq!(query.language, Language::En);
        assert!(query.max_requests.is_none());
        assert!(!query.return_context);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&GeoStatus::CacheNever).unwrap();
        assert_eq!(json, "\"cache_never\"");
        assert_eq!(GeoStatus::Requestlimit.to_string(), "requestlimit");
    }
}
