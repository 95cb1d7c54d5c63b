//! Blocking client for the OpenCage forward-geocoding API.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::GeocodeError;
use crate::provider::{Geocoder, ProviderMatch};

/// Timeout for one geocoding request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const COUNTRY_COMPONENT: &str = "ISO_3166-1_alpha-3";

pub struct OpenCageClient {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Deserialize)]
struct OpenCageBody {
    #[serde(default)]
    results: Vec<OpenCageResult>,
    rate: Option<OpenCageRate>,
}

#[derive(Deserialize)]
struct OpenCageResult {
    geometry: OpenCageGeometry,
    #[serde(default)]
    formatted: String,
    #[serde(default)]
    components: HashMap<String, serde_json::Value>,
    #[serde(default)]
    confidence: f64,
}

#[derive(Deserialize)]
struct OpenCageGeometry {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct OpenCageRate {
    /// Unix seconds.
    reset: Option<i64>,
}

impl OpenCageClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }
}

impl Geocoder for OpenCageClient {
    fn geocode(&self, query: &str) -> Result<Vec<ProviderMatch>, GeocodeError> {
        let url = format!("{}/geocode/v1/json", self.base_url);
        let params = [
            ("q", query),
            ("key", self.api_key.as_str()),
            ("no_annotations", "1"),
        ];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        match status {
            StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS => {
                Err(GeocodeError::RateLimited {
                    reset: rate_reset(&body),
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GeocodeError::Auth(body)),
            s if !s.is_success() => Err(GeocodeError::Http {
                status: s.as_u16(),
                body,
            }),
            _ => {
                let matches = parse_matches(&body)?;
                debug!("OpenCage: {} candidates for {:?}", matches.len(), query);
                Ok(matches)
            }
        }
    }

    fn name(&self) -> &str {
        "opencage"
    }
}

/// Candidates of a successful response, in provider order.
fn parse_matches(body: &str) -> Result<Vec<ProviderMatch>, GeocodeError> {
    let body: OpenCageBody =
        serde_json::from_str(body).map_err(|e| GeocodeError::Payload(e.to_string()))?;

    Ok(body
        .results
        .into_iter()
        .map(|r| ProviderMatch {
            lat: r.geometry.lat,
            lng: r.geometry.lng,
            formatted: r.formatted,
            country_code: r
                .components
                .get(COUNTRY_COMPONENT)
                .and_then(|v| v.as_str())
                .map(str::to_string),
            confidence: r.confidence,
        })
        .collect())
}

/// Quota reset time advertised in a rate-limited response body, if any.
fn rate_reset(body: &str) -> Option<DateTime<Utc>> {
    let body: OpenCageBody = serde_json::from_str(body).ok()?;
    DateTime::from_timestamp(body.rate?.reset?, 0)
}
