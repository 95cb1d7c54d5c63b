//! Geocoding provider trait.

use serde::{Deserialize, Serialize};

use crate::error::GeocodeError;

/// One forward-geocoding candidate as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMatch {
    pub lat: f64,
    pub lng: f64,
    pub formatted: String,
    /// ISO 3166-1 alpha-3 code, when the provider knows the country.
    pub country_code: Option<String>,
    pub confidence: f64,
}

/// Trait for forward geocoding providers.
pub trait Geocoder: Send + Sync {
    /// Candidates for `query`, best first. An empty list means no match.
    fn geocode(&self, query: &str) -> Result<Vec<ProviderMatch>, GeocodeError>;

    fn name(&self) -> &str;
}

/// Placeholder provider used when no API key is configured.
pub struct NoopGeocoder;

impl Geocoder for NoopGeocoder {
    fn geocode(&self, _query: &str) -> Result<Vec<ProviderMatch>, GeocodeError> {
        Err(GeocodeError::Auth("no geocoding API key configured".into()))
    }

    fn name(&self) -> &str {
        "noop"
    }
}
