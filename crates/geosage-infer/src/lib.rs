//! GeoSage Infer — NER collaborator, per-language profiles, language detection.
//!
//! The `NerClassifier` trait abstracts over the inference engine hosting the
//! NER models. `HttpNer` talks to a remote engine; `NoopNer` reports every
//! chunk as failed so extraction degrades to an empty entity list.

pub mod http_ner;
pub mod language;
pub mod ner;

pub use http_ner::HttpNer;
pub use language::{detect_language, DetectedLanguage};
pub use ner::{NerClassifier, NerProfiles, NerResult, NoopNer};

use std::sync::Arc;

use geosage_core::Language;

/// Build NER profiles for `languages`, all served by the engine at `ner_url`.
pub fn create_profiles(ner_url: &str, languages: &[Language]) -> NerProfiles {
    let mut profiles = NerProfiles::new();
    for &language in languages {
        let classifier: Arc<dyn NerClassifier> = Arc::new(HttpNer::new(ner_url, language));
        profiles.insert(language, classifier);
    }
    tracing::info!(
        "NER profiles: {}",
        languages
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );
    profiles
}
