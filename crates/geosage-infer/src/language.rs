//! Statistical language identification.

use serde::Serialize;

/// Detected language of a text.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedLanguage {
    /// ISO 639-3 code, e.g. `eng`.
    pub code: String,
    pub name: String,
    pub confidence: f64,
    pub reliable: bool,
}

/// Detect the language of `text`. Returns `None` when no guess is possible.
pub fn detect_language(text: &str) -> Option<DetectedLanguage> {
    let info = whatlang::detect(text)?;
    Some(DetectedLanguage {
        code: info.lang().code().to_string(),
        name: info.lang().eng_name().to_string(),
        confidence: info.confidence(),
        reliable: info.is_reliable(),
    })
}
