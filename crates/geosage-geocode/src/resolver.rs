//! Live resolution of one query through the geocoding provider.
//!
//! Rate limiting is absorbed here: the resolver sleeps until the advertised
//! reset (or a fixed delay) and retries a bounded number of times. Resets too
//! far away end the attempt at once.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::GeocodeError;
use crate::provider::{Geocoder, ProviderMatch};
use geosage_core::{relevance_for_rank, GeoResponse, GeoResult, GeoStatus, NUL_COUNTRY};

/// Provider calls per query before reporting `ratelimit`.
pub const MAX_ATTEMPTS: u32 = 10;
/// Longest wait for a quota reset before giving up.
pub const MAX_RESET_WAIT: Duration = Duration::from_secs(10);
/// Sleep between rate-limited attempts when no reset time is known.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct GeocodingResolver {
    geocoder: Arc<dyn Geocoder>,
    retry_delay: Duration,
    max_attempts: u32,
}

impl GeocodingResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Resolve `query` live. Never fails: provider trouble becomes a status.
    pub fn resolve(&self, query: &str) -> GeoResult {
        let query = query.trim();
        if query.is_empty() {
            return GeoResult::empty(GeoStatus::Invalid);
        }

        for attempt in 1..=self.max_attempts {
            let wait = match self.geocoder.geocode(query) {
                Ok(matches) if matches.is_empty() => {
                    debug!("No geocoding match for {:?}", query);
                    return GeoResult::empty(GeoStatus::Invalid);
                }
                Ok(matches) => {
                    return GeoResult::new(Some(to_responses(query, matches)), GeoStatus::Ok)
                }
                Err(GeocodeError::RateLimited { reset }) => match reset {
                    Some(reset) => {
                        let wait = (reset - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                        if wait > MAX_RESET_WAIT {
                            warn!(
                                "{} rate limit resets in {}s, giving up on {:?}",
                                self.geocoder.name(),
                                wait.as_secs(),
                                query
                            );
                            return GeoResult::empty(GeoStatus::Ratelimit);
                        }
                        wait
                    }
                    None => self.retry_delay,
                },
                Err(e) => {
                    warn!("Geocoding {:?} failed: {}", query, e);
                    return GeoResult::empty(GeoStatus::Invalid);
                }
            };

            if attempt < self.max_attempts {
                debug!(
                    "Rate limited on {:?} (attempt {}/{}), retrying in {}ms",
                    query,
                    attempt,
                    self.max_attempts,
                    wait.as_millis()
                );
                std::thread::sleep(wait);
            }
        }

        warn!(
            "Rate limit persisted for {:?} after {} attempts",
            query, self.max_attempts
        );
        GeoResult::empty(GeoStatus::Ratelimit)
    }
}

fn to_responses(query: &str, matches: Vec<ProviderMatch>) -> Vec<GeoResponse> {
    matches
        .into_iter()
        .enumerate()
        .map(|(rank, m)| {
            let country = m.country_code.unwrap_or_else(|| {
                warn!("No country code for {:?} ({})", query, m.formatted);
                NUL_COUNTRY.to_string()
            });
            GeoResponse {
                lat: m.lat,
                lng: m.lng,
                formatted: m.formatted,
                country,
                relevance: relevance_for_rank(rank),
                confidence: m.confidence,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted answers; an exhausted script keeps rate limiting.
    struct StubGeocoder {
        script: Mutex<VecDeque<Result<Vec<ProviderMatch>, GeocodeError>>>,
        calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl StubGeocoder {
        fn new(script: Vec<Result<Vec<ProviderMatch>, GeocodeError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Geocoder for StubGeocoder {
        fn geocode(&self, query: &str) -> Result<Vec<ProviderMatch>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().push(query.to_string());
            self.script
                .lock()
                .pop_front()
                .unwrap_or(Err(GeocodeError::RateLimited { reset: None }))
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn provider_match(formatted: &str, country: Option<&str>) -> ProviderMatch {
        ProviderMatch {
            lat: 48.8566,
            lng: 2.3522,
            formatted: formatted.to_string(),
            country_code: country.map(str::to_string),
            confidence: 7.0,
        }
    }

    fn resolver(geocoder: &Arc<StubGeocoder>) -> GeocodingResolver {
        GeocodingResolver::new(geocoder.clone()).with_retry_delay(Duration::ZERO)
    }

    #[test]
    fn test_matches_become_ranked_responses() {
        let geocoder = StubGeocoder::new(vec![Ok(vec![
            provider_match("Paris, France", Some("FRA")),
            provider_match("Paris, TX, USA", Some("USA")),
        ])]);
        let result = resolver(&geocoder).resolve("  Paris ");

        assert_eq!(result.status, GeoStatus::Ok);
        let responses = result.responses.unwrap();
        assert_eq!(responses[0].relevance, 1.0);
        assert_eq!(responses[1].relevance, 0.5);
        assert_eq!(responses[1].confidence, 7.0);
        assert_eq!(responses[1].country, "USA");
        assert_eq!(geocoder.queries.lock().as_slice(), ["Paris"]);
    }

    #[test]
    fn test_missing_country_becomes_nul() {
        let geocoder = StubGeocoder::new(vec![Ok(vec![provider_match("Atlantic Ocean", None)])]);
        let result = resolver(&geocoder).resolve("Atlantic");
        assert_eq!(result.responses.unwrap()[0].country, NUL_COUNTRY);
    }

    #[test]
    fn test_empty_answer_is_invalid() {
        let geocoder = StubGeocoder::new(vec![Ok(Vec::new())]);
        let result = resolver(&geocoder).resolve("Xyzzy");
        assert_eq!(result, GeoResult::empty(GeoStatus::Invalid));
        assert_eq!(geocoder.calls(), 1);
    }

    #[test]
    fn test_blank_query_skips_provider() {
        let geocoder = StubGeocoder::new(Vec::new());
        assert_eq!(resolver(&geocoder).resolve("   ").status, GeoStatus::Invalid);
        assert_eq!(geocoder.calls(), 0);
    }

    #[test]
    fn test_rate_limit_retried_until_success() {
        let geocoder = StubGeocoder::new(vec![
            Err(GeocodeError::RateLimited { reset: None }),
            Err(GeocodeError::RateLimited {
                reset: Some(Utc::now() - ChronoDuration::seconds(5)),
            }),
            Ok(vec![provider_match("Lyon, France", Some("FRA"))]),
        ]);
        let result = resolver(&geocoder).resolve("Lyon");

        assert_eq!(result.status, GeoStatus::Ok);
        assert_eq!(geocoder.calls(), 3);
    }

    #[test]
    fn test_rate_limit_exhausts_attempts() {
        let geocoder = StubGeocoder::new(Vec::new());
        let result = resolver(&geocoder).resolve("Lyon");

        assert_eq!(result, GeoResult::empty(GeoStatus::Ratelimit));
        assert_eq!(geocoder.calls(), MAX_ATTEMPTS as usize);
    }

    #[test]
    fn test_distant_reset_gives_up_immediately() {
        let geocoder = StubGeocoder::new(vec![Err(GeocodeError::RateLimited {
            reset: Some(Utc::now() + ChronoDuration::hours(1)),
        })]);
        let result = resolver(&geocoder).resolve("Lyon");

        assert_eq!(result.status, GeoStatus::Ratelimit);
        assert_eq!(geocoder.calls(), 1);
    }

    #[test]
    fn test_provider_errors_are_invalid() {
        let geocoder = StubGeocoder::new(vec![
            Err(GeocodeError::Http {
                status: 503,
                body: "unavailable".into(),
            }),
            Err(GeocodeError::Auth("bad key".into())),
        ]);
        let resolver = resolver(&geocoder);

        assert_eq!(resolver.resolve("Lyon").status, GeoStatus::Invalid);
        assert_eq!(resolver.resolve("Nice").status, GeoStatus::Invalid);
        assert_eq!(geocoder.calls(), 2);
    }

    #[test]
    fn test_noop_geocoder_is_invalid() {
        let resolver = GeocodingResolver::new(Arc::new(crate::provider::NoopGeocoder));
        assert_eq!(resolver.resolve("Paris").status, GeoStatus::Invalid);
    }
}
