//! Resolution strategies choosing one candidate per query.

use std::collections::HashMap;

use geosage_core::{GeoResponse, GeoResult, GeoStatus, StrategyKind};

/// Chosen candidate (if any) and the status of the query it came from.
pub type Resolution = (Option<GeoResponse>, GeoStatus);

/// Resolves a normalized query against a document's results.
pub type ResolveFn = Box<dyn Fn(&str) -> Resolution + Send + Sync>;

pub trait StrategyExt {
    /// Build the resolution callback over the document's distinct `queries`.
    /// Queries absent from `results` resolve to `(None, cache_miss)`.
    fn callback(&self, queries: &[String], results: &HashMap<String, GeoResult>) -> ResolveFn;
}

impl StrategyExt for StrategyKind {
    fn callback(&self, queries: &[String], results: &HashMap<String, GeoResult>) -> ResolveFn {
        let chosen: HashMap<String, Resolution> = match self {
            StrategyKind::Top => queries
                .iter()
                .filter_map(|q| results.get(q).map(|r| (q.clone(), top(r))))
                .collect(),
            StrategyKind::Frequency => {
                let scores = country_scores(queries, results);
                queries
                    .iter()
                    .filter_map(|q| results.get(q).map(|r| (q.clone(), least_frequent(r, &scores))))
                    .collect()
            }
        };

        Box::new(move |query: &str| {
            chosen
                .get(query.trim())
                .cloned()
                .unwrap_or((None, GeoStatus::CacheMiss))
        })
    }
}

fn top(result: &GeoResult) -> Resolution {
    let location = result
        .responses
        .as_ref()
        .and_then(|responses| responses.first().cloned());
    (location, result.status)
}

/// Sum of candidate relevances per country across the document.
fn country_scores(queries: &[String], results: &HashMap<String, GeoResult>) -> HashMap<String, f64> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    for responses in queries
        .iter()
        .filter_map(|q| results.get(q))
        .filter_map(|r| r.responses.as_ref())
    {
        for response in responses {
            *scores.entry(response.country.clone()).or_default() += response.relevance;
        }
    }
    scores
}

/// Candidate maximizing `relevance / (1 + country score)`; the first wins ties.
fn least_frequent(result: &GeoResult, scores: &HashMap<String, f64>) -> Resolution {
    let mut best: Option<(&GeoResponse, f64)> = None;
    for response in result.responses.iter().flatten() {
        let score = scores.get(&response.country).copied().unwrap_or(0.0);
        let weight = response.relevance / (1.0 + score);
        if best.map_or(true, |(_, w)| weight > w) {
            best = Some((response, weight));
        }
    }
    (best.map(|(r, _)| r.clone()), result.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosage_core::relevance_for_rank;

    fn candidates(query: &str, countries: &[&str]) -> (String, GeoResult) {
        let responses = countries
            .iter()
            .enumerate()
            .map(|(rank, country)| GeoResponse {
                lat: 0.0,
                lng: 0.0,
                formatted: format!("{}, {}", query, country),
                country: country.to_string(),
                relevance: relevance_for_rank(rank),
                confidence: 0.0,
            })
            .collect();
        (
            query.to_string(),
            GeoResult::new(Some(responses), GeoStatus::CacheHit),
        )
    }

    fn document() -> (Vec<String>, HashMap<String, GeoResult>) {
        let results: HashMap<String, GeoResult> = [
            candidates("Paris", &["FRA", "USA"]),
            candidates("Lyon", &["FRA"]),
            candidates("Nice", &["FRA"]),
        ]
        .into_iter()
        .collect();
        let queries = vec!["Paris".to_string(), "Lyon".to_string(), "Nice".to_string()];
        (queries, results)
    }

    #[test]
    fn test_top_takes_first_candidate() {
        let (queries, results) = document();
        let resolve = StrategyKind::Top.callback(&queries, &results);

        let (location, status) = resolve("Paris");
        assert_eq!(location.unwrap().country, "FRA");
        assert_eq!(status, GeoStatus::CacheHit);
    }

    #[test]
    fn test_frequency_penalizes_dominant_country() {
        let (queries, results) = document();
        // FRA scores 3.0, USA 0.5: 1.0 / 4.0 < 0.5 / 1.5.
        let resolve = StrategyKind::Frequency.callback(&queries, &results);

        assert_eq!(resolve("Paris").0.unwrap().country, "USA");
        assert_eq!(resolve("Lyon").0.unwrap().country, "FRA");
    }

    #[test]
    fn test_frequency_first_candidate_wins_ties() {
        let results: HashMap<String, GeoResult> = [
            candidates("Paris", &["FRA", "USA"]),
            candidates("Lyon", &["FRA"]),
        ]
        .into_iter()
        .collect();
        let queries = vec!["Paris".to_string(), "Lyon".to_string()];
        // FRA 2.0, USA 0.5: 1.0 / 3.0 == 0.5 / 1.5.
        let resolve = StrategyKind::Frequency.callback(&queries, &results);
        assert_eq!(resolve("Paris").0.unwrap().country, "FRA");
    }

    #[test]
    fn test_unknown_query_is_cache_miss() {
        let (queries, results) = document();
        for kind in [StrategyKind::Top, StrategyKind::Frequency] {
            let resolve = kind.callback(&queries, &results);
            assert_eq!(resolve("Atlantis"), (None, GeoStatus::CacheMiss));
        }
    }

    #[test]
    fn test_query_without_candidates_keeps_status() {
        let results = HashMap::from([(
            "Xyzzy".to_string(),
            GeoResult::empty(GeoStatus::Invalid),
        )]);
        let queries = vec!["Xyzzy".to_string()];
        for kind in [StrategyKind::Top, StrategyKind::Frequency] {
            let resolve = kind.callback(&queries, &results);
            assert_eq!(resolve(" Xyzzy "), (None, GeoStatus::Invalid));
        }
    }
}
