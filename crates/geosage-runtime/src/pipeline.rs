//! Location extraction pipeline.
//!
//! One document flows through NER, the location cache, budgeted live
//! geocoding and the selected strategy. Every call bills the caller once.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::status::{bill, worst};
use crate::strategy::StrategyExt;
use geosage_core::{EntityInfo, GeoOutput, GeoQuery, GeoResult, GeoStatus, Result, NUL_COUNTRY};
use geosage_geocode::GeocodingResolver;
use geosage_infer::{detect_language, NerProfiles};
use geosage_ingest::{get_context, NerChunker};
use geosage_store::{SqliteStore, UsageDelta};

/// Result of language detection on one text.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageOutput {
    /// ISO 639-3 code, `None` when no guess was possible.
    pub language: Option<String>,
    pub name: Option<String>,
    pub confidence: f64,
    pub reliable: bool,
}

pub struct LocationPipeline {
    resolver: GeocodingResolver,
    default_max_requests: Option<usize>,
}

/// One entity mention: trimmed text and byte span as reported by NER.
struct Mention {
    query: String,
    start: usize,
    stop: usize,
}

impl LocationPipeline {
    pub fn new(resolver: GeocodingResolver) -> Self {
        Self {
            resolver,
            default_max_requests: None,
        }
    }

    /// Live-request budget for queries that leave `max_requests` unset.
    pub fn with_default_max_requests(mut self, max_requests: Option<usize>) -> Self {
        self.default_max_requests = max_requests;
        self
    }

    /// Extract, geocode and rank the locations mentioned in `query.input`.
    pub fn extract_locations(
        &self,
        store: &SqliteStore,
        profiles: &NerProfiles,
        query: &GeoQuery,
        user_id: &str,
    ) -> Result<GeoOutput> {
        let classifier = profiles.get(query.language)?;
        let text = query.input.as_str();

        let mentions: Vec<Mention> = NerChunker::new(classifier.as_ref())
            .get_locations(text)
            .filter_map(|span| {
                let trimmed = span.text.trim();
                (!trimmed.is_empty()).then(|| Mention {
                    query: trimmed.to_string(),
                    start: span.start,
                    stop: span.stop,
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let queries: Vec<String> = mentions
            .iter()
            .filter(|m| seen.insert(m.query.as_str()))
            .map(|m| m.query.clone())
            .collect();

        let mut results = store.read_locations(&queries)?;
        let fresh = self.resolve_misses(&queries, &mut results, query.max_requests);
        store.write_locations(&fresh)?;

        let resolve = query.strategy.callback(&queries, &results);

        let mut delta = UsageDelta::default();
        let mut status: Option<GeoStatus> = None;
        let mut entities: Vec<EntityInfo> = Vec::with_capacity(queries.len());
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut countries: Vec<(String, usize)> = Vec::new();

        for mention in &mentions {
            let context = query
                .return_context
                .then(|| get_context(text, mention.start, mention.stop));

            let entity = match index.get(mention.query.as_str()).copied() {
                Some(i) => {
                    let entity = &mut entities[i];
                    entity.spans.push((mention.start, mention.stop));
                    if let (Some(contexts), Some(context)) = (entity.contexts.as_mut(), context) {
                        contexts.push(context);
                    }
                    entity.count += 1;
                    &*entity
                }
                None => {
                    let (location, entity_status) = resolve(&mention.query);
                    bill(&mut delta, entity_status);
                    status = Some(status.map_or(entity_status, |s| worst(s, entity_status)));

                    index.insert(mention.query.as_str(), entities.len());
                    entities.push(EntityInfo {
                        query: mention.query.clone(),
                        spans: vec![(mention.start, mention.stop)],
                        contexts: context.map(|c| vec![c]),
                        location,
                        count: 1,
                        status: entity_status,
                    });
                    &entities[entities.len() - 1]
                }
            };

            if let Some(location) = &entity.location {
                tally(&mut countries, &location.country);
            }
        }

        let country = dominant_country(&countries);
        entities.sort_by(|a, b| b.count.cmp(&a.count));

        delta.location_count = 1;
        delta.location_length = text.chars().count() as u64;
        store.add_usage(user_id, &delta)?;

        let status = status.unwrap_or(GeoStatus::Ok);
        info!(
            "Extracted {} locations ({} mentions) from {} bytes: status={}, country={}",
            entities.len(),
            mentions.len(),
            text.len(),
            status,
            country
        );

        Ok(GeoOutput {
            status,
            country,
            input: query.return_input.then(|| query.input.clone()),
            entities,
        })
    }

    /// Geocode a single query, answering in the provider's response shape.
    pub fn extract_opencage(
        &self,
        store: &SqliteStore,
        text: &str,
        user_id: &str,
    ) -> Result<serde_json::Value> {
        let query = text.trim().to_string();
        let mut results = store.read_locations([query.as_str()])?;
        let fresh = self.resolve_misses(std::slice::from_ref(&query), &mut results, None);
        store.write_locations(&fresh)?;

        let result = results
            .remove(&query)
            .unwrap_or_else(|| GeoResult::empty(GeoStatus::CacheMiss));

        let mut delta = UsageDelta::default();
        bill(&mut delta, result.status);
        store.add_usage(user_id, &delta)?;

        let candidates: Vec<serde_json::Value> = result
            .responses
            .iter()
            .flatten()
            .map(|r| {
                json!({
                    "geometry": {"lat": r.lat, "lng": r.lng},
                    "formatted": r.formatted,
                    "components": {"ISO_3166-1_alpha-3": r.country},
                    "confidence": r.confidence,
                })
            })
            .collect();

        let total = candidates.len();
        let (code, message) = match result.status {
            GeoStatus::Ratelimit => (429, "Rate limit exceeded"),
            _ => (200, "OK"),
        };

        Ok(json!({
            "results": candidates,
            "status": {"code": code, "message": message},
            "total_results": total,
            "geosage": {"status": result.status},
        }))
    }

    /// Identify the language of `text`, billing the language counters.
    pub fn detect_language(
        &self,
        store: &SqliteStore,
        text: &str,
        user_id: &str,
    ) -> Result<LanguageOutput> {
        let detected = detect_language(text);
        store.add_usage(
            user_id,
            &UsageDelta {
                language_count: 1,
                language_length: text.chars().count() as u64,
                ..Default::default()
            },
        )?;

        Ok(match detected {
            Some(d) => LanguageOutput {
                language: Some(d.code),
                name: Some(d.name),
                confidence: d.confidence,
                reliable: d.reliable,
            },
            None => LanguageOutput {
                language: None,
                name: None,
                confidence: 0.0,
                reliable: false,
            },
        })
    }

    /// Resolve cache misses live in document order until the budget runs out.
    /// Returns the freshly resolved results; `results` is updated in place.
    fn resolve_misses(
        &self,
        queries: &[String],
        results: &mut HashMap<String, GeoResult>,
        max_requests: Option<usize>,
    ) -> HashMap<String, GeoResult> {
        let budget = max_requests.or(self.default_max_requests);
        let mut fresh = HashMap::new();
        let mut calls = 0;

        for query in queries {
            let miss = results
                .get(query)
                .map_or(true, |r| r.status == GeoStatus::CacheMiss && !r.has_candidates());
            if !miss {
                continue;
            }

            if budget.map_or(false, |b| calls >= b) {
                results.insert(query.clone(), GeoResult::empty(GeoStatus::Requestlimit));
                continue;
            }

            calls += 1;
            let result = self.resolver.resolve(query);
            debug!("Resolved {:?} live: {}", query, result.status);
            fresh.insert(query.clone(), result.clone());
            results.insert(query.clone(), result);
        }

        if calls > 0 {
            debug!("Live geocoding: {} requests (budget {:?})", calls, budget);
        }
        fresh
    }
}

fn tally(countries: &mut Vec<(String, usize)>, country: &str) {
    match countries.iter_mut().find(|(c, _)| c == country) {
        Some((_, n)) => *n += 1,
        None => countries.push((country.to_string(), 1)),
    }
}

/// Most frequent country; the first one reached wins ties.
fn dominant_country(countries: &[(String, usize)]) -> String {
    let mut best: Option<&(String, usize)> = None;
    for entry in countries {
        if best.map_or(true, |(_, n)| entry.1 > *n) {
            best = Some(entry);
        }
    }
    best.map(|(c, _)| c.clone())
        .unwrap_or_else(|| NUL_COUNTRY.to_string())
}
