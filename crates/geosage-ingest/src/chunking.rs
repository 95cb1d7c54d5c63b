//! Overlapping, word-aligned chunking of long texts for the NER collaborator.
//!
//! Texts longer than [`MAX_PROCESS_SIZE`] are cut near that size at the next
//! whitespace. The following chunk starts up to [`SPLIT_GRACE`] bytes earlier, on
//! a word boundary, so both chunks see the words around the cut. Entities the
//! later chunk finds inside that overlap were already reported by the earlier
//! one and are suppressed; multi-word entities crossing the cut are taken from
//! the later chunk, which is the only one holding them whole.

use tracing::{debug, warn};

use crate::context::{ceil_char_boundary, floor_char_boundary};
use geosage_infer::NerClassifier;

/// Maximum chunk size handed to the NER collaborator, in bytes.
pub const MAX_PROCESS_SIZE: usize = 1000;
/// Window searched for a word boundary around each cut, in bytes.
pub const SPLIT_GRACE: usize = 50;

/// A chunk of the input with its absolute byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunk {
    pub start: usize,
    /// End of this chunk; entities of the next chunk starting before it are duplicates.
    pub end: usize,
}

/// One entity mention with byte offsets into the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    pub text: String,
    pub start: usize,
    pub stop: usize,
}

/// Split `text` into overlapping chunks of at most about `MAX_PROCESS_SIZE` bytes.
pub fn split_chunks(text: &str) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut start = 0;

    while text.len() - start > MAX_PROCESS_SIZE {
        let end = split_point(text, start);
        let next = overlap_start(text, start, end);
        chunks.push(TextChunk { start, end });
        start = next;
    }
    chunks.push(TextChunk {
        start,
        end: text.len(),
    });
    chunks
}

/// End of the chunk starting at `start`: the first whitespace at or after the
/// target size, within the grace window.
fn split_point(text: &str, start: usize) -> usize {
    let target = floor_char_boundary(text, start + MAX_PROCESS_SIZE);
    let limit = ceil_char_boundary(text, target + SPLIT_GRACE);
    text[target..limit]
        .find(char::is_whitespace)
        .map(|p| target + p)
        .unwrap_or(target)
}

/// Start of the chunk following `start..end`: the first word beginning inside
/// the grace window before `end`, or `end` when the window holds no boundary.
fn overlap_start(text: &str, start: usize, end: usize) -> usize {
    let lo = ceil_char_boundary(text, end.saturating_sub(SPLIT_GRACE).max(start + 1));
    if text[..lo].ends_with(char::is_whitespace) {
        return lo;
    }
    match text[lo..end].find(char::is_whitespace) {
        Some(p) => {
            let rest = text[lo + p..end].trim_start();
            end - rest.len()
        }
        None => end,
    }
}

/// Runs a NER collaborator over arbitrarily long texts.
pub struct NerChunker<'a> {
    ner: &'a dyn NerClassifier,
}

impl<'a> NerChunker<'a> {
    pub fn new(ner: &'a dyn NerClassifier) -> Self {
        Self { ner }
    }

    /// Location mentions in `text`, in document order, each reported once.
    pub fn get_locations(&self, text: &str) -> impl Iterator<Item = EntitySpan> {
        let chunks = split_chunks(text);
        let texts: Vec<&str> = chunks.iter().map(|c| &text[c.start..c.end]).collect();
        let mut results = self.ner.classify(&texts);
        results.resize(chunks.len(), None);

        debug!(
            "NER profile {} over {} chunks ({} bytes)",
            self.ner.name(),
            chunks.len(),
            text.len()
        );

        let mut spans: Vec<EntitySpan> = Vec::new();
        // End of the previous chunk, if its entities were counted.
        let mut counted_until: Option<usize> = None;

        for (index, (chunk, result)) in chunks.iter().zip(results).enumerate() {
            let Some(result) = result else {
                warn!("NER failed on chunk {} ({}..{})", index, chunk.start, chunk.end);
                counted_until = None;
                continue;
            };

            for (entity, rel_start, rel_stop) in result.iter() {
                let start = chunk.start + rel_start;
                let stop = chunk.start + rel_stop;

                if let Some(prev_end) = counted_until {
                    if start < prev_end {
                        if stop <= prev_end {
                            continue;
                        }
                        spans.retain(|s| s.stop <= start || s.start >= stop);
                    }
                }

                spans.push(EntitySpan {
                    text: entity.to_string(),
                    start,
                    stop,
                });
            }
            counted_until = Some(chunk.end);
        }

        spans.into_iter()
    }
}
