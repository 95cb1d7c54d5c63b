//! NER collaborator trait and per-language profile registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use geosage_core::{Error, Language, Result};

/// Entities recognized in one chunk. `ranges[i]` is the byte span of
/// `entities[i]` relative to the chunk text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerResult {
    pub entities: Vec<String>,
    pub ranges: Vec<(usize, usize)>,
}

impl NerResult {
    /// Iterate over `(entity, start, stop)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, usize)> + '_ {
        self.entities
            .iter()
            .zip(self.ranges.iter())
            .map(|(entity, &(start, stop))| (entity.as_str(), start, stop))
    }
}

/// Trait for named-entity recognizers returning location mentions.
pub trait NerClassifier: Send + Sync {
    /// Classify a batch of chunks. One slot per input chunk, in order;
    /// `None` marks a chunk the engine failed on.
    fn classify(&self, chunks: &[&str]) -> Vec<Option<NerResult>>;

    /// Profile name as known to the inference engine.
    fn name(&self) -> &str;
}

/// Placeholder recognizer that fails every chunk.
pub struct NoopNer;

impl NerClassifier for NoopNer {
    fn classify(&self, chunks: &[&str]) -> Vec<Option<NerResult>> {
        vec![None; chunks.len()]
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// NER recognizers keyed by request language.
#[derive(Clone, Default)]
pub struct NerProfiles {
    profiles: HashMap<Language, Arc<dyn NerClassifier>>,
}

impl NerProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, language: Language, classifier: Arc<dyn NerClassifier>) {
        self.profiles.insert(language, classifier);
    }

    pub fn with(mut self, language: Language, classifier: Arc<dyn NerClassifier>) -> Self {
        self.insert(language, classifier);
        self
    }

    /// Profile for `language`; a missing profile is a deployment mistake.
    pub fn get(&self, language: Language) -> Result<&Arc<dyn NerClassifier>> {
        self.profiles
            .get(&language)
            .ok_or_else(|| Error::Config(format!("no NER profile for language: {}", language)))
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.profiles.keys().copied().collect();
        languages.sort_by_key(|l| l.as_str());
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_fails_every_chunk() {
        let results = NoopNer.classify(&["a", "b", "c"]);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(Option::is_none));
    }

    #[test]
    fn test_missing_profile_is_config_error() {
        let profiles = NerProfiles::new().with(Language::En, Arc::new(NoopNer));
        assert!(profiles.get(Language::En).is_ok());
        assert!(matches!(profiles.get(Language::De), Err(Error::Config(_))));
        assert_eq!(profiles.languages(), vec![Language::En]);
    }

    #[test]
    fn test_ner_result_iter() {
        let result = NerResult {
            entities: vec!["Paris".into(), "Rome".into()],
            ranges: vec![(0, 5), (10, 14)],
        };
        let triples: Vec<_> = result.iter().collect();
        assert_eq!(triples, vec![("Paris", 0, 5), ("Rome", 10, 14)]);
    }
}
