//! HTTP client for a remote NER inference engine.
//!
//! The engine receives `{"profile": "en", "texts": [...]}` and answers with one
//! slot per text, `null` for texts it failed on. Its ranges count characters;
//! they are converted to byte offsets here.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ner::{NerClassifier, NerResult};
use geosage_core::Language;

/// Timeout for one batch request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct HttpNer {
    url: String,
    profile: String,
    client: Client,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    profile: &'a str,
    texts: &'a [&'a str],
}

#[derive(Deserialize)]
struct RawNerResult {
    entities: Vec<String>,
    ranges: Vec<(usize, usize)>,
}

impl HttpNer {
    pub fn new(url: impl Into<String>, language: Language) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            url: url.into(),
            profile: language.as_str().to_string(),
            client,
        }
    }

    fn request(&self, chunks: &[&str]) -> Result<Vec<Option<RawNerResult>>, String> {
        let response = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest {
                profile: &self.profile,
                texts: chunks,
            })
            .send()
            .map_err(|e| format!("Request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(format!("API error {}: {}", status, body));
        }

        response
            .json::<Vec<Option<RawNerResult>>>()
            .map_err(|e| format!("Invalid response: {}", e))
    }
}

impl NerClassifier for HttpNer {
    fn classify(&self, chunks: &[&str]) -> Vec<Option<NerResult>> {
        if chunks.is_empty() {
            return Vec::new();
        }

        let raw = match self.request(chunks) {
            Ok(raw) if raw.len() == chunks.len() => raw,
            Ok(raw) => {
                warn!(
                    "NER engine returned {} results for {} chunks",
                    raw.len(),
                    chunks.len()
                );
                return vec![None; chunks.len()];
            }
            Err(e) => {
                warn!("NER profile {} unavailable: {}", self.profile, e);
                return vec![None; chunks.len()];
            }
        };

        debug!("NER profile {} classified {} chunks", self.profile, chunks.len());
        raw.into_iter()
            .zip(chunks.iter())
            .map(|(slot, chunk)| slot.map(|r| to_byte_ranges(chunk, r)))
            .collect()
    }

    fn name(&self) -> &str {
        &self.profile
    }
}

/// Convert character ranges to byte ranges, dropping ranges outside the chunk.
fn to_byte_ranges(chunk: &str, raw: RawNerResult) -> NerResult {
    let offsets: Vec<usize> = chunk
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(chunk.len()))
        .collect();

    let mut result = NerResult::default();
    for (entity, (start, stop)) in raw.entities.into_iter().zip(raw.ranges) {
        match (offsets.get(start), offsets.get(stop)) {
            (Some(&s), Some(&e)) if s <= e => {
                result.entities.push(entity);
                result.ranges.push((s, e));
            }
            _ => debug!("Dropping out-of-range entity {:?} ({}..{})", entity, start, stop),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_ranges_become_byte_ranges() {
        let chunk = "Zürich und Köln";
        let raw = RawNerResult {
            entities: vec!["Zürich".into(), "Köln".into()],
            ranges: vec![(0, 6), (11, 15)],
        };
        let result = to_byte_ranges(chunk, raw);
        assert_eq!(result.ranges, vec![(0, 7), (12, 17)]);
        assert_eq!(&chunk[12..17], "Köln");
    }

    #[test]
    fn test_out_of_range_entities_are_dropped() {
        let raw = RawNerResult {
            entities: vec!["Oslo".into(), "Bergen".into()],
            ranges: vec![(0, 4), (20, 26)],
        };
        let result = to_byte_ranges("Oslo", raw);
        assert_eq!(result.entities, vec!["Oslo".to_string()]);
    }

    #[test]
    fn test_unreachable_engine_fails_all_chunks() {
        let ner = HttpNer::new("http://127.0.0.1:9/ner", Language::En);
        let results = ner.classify(&["Paris", "Rome"]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Option::is_none));
        assert_eq!(ner.name(), "en");
    }
}
