//! Bounded context excerpts around entity mentions.

/// Characters of context kept on each side of a span.
pub const CONTEXT_MARGIN: usize = 20;
/// Maximum extra characters taken to finish a word at either edge.
pub const WORD_GRACE: usize = 10;

const SPAN_MARK: char = '*';
const ELLIPSIS: &str = "...";

/// Excerpt of `text` around `start..stop` with the span wrapped in `*`.
///
/// Offsets are clamped to the text and snapped to char boundaries. `...` marks
/// an excerpt that does not reach the start or end of the text.
pub fn get_context(text: &str, start: usize, stop: usize) -> String {
    let len = text.len();
    let start = floor_char_boundary(text, start.min(len));
    let stop = ceil_char_boundary(text, stop.min(len)).max(start);

    let mut lo = text[..start]
        .char_indices()
        .rev()
        .take(CONTEXT_MARGIN)
        .last()
        .map_or(start, |(i, _)| i);
    let mut hi = text[stop..]
        .char_indices()
        .nth(CONTEXT_MARGIN)
        .map_or(len, |(i, _)| stop + i);

    for _ in 0..WORD_GRACE {
        match text[..lo].chars().next_back() {
            Some(c) if !c.is_whitespace() => lo -= c.len_utf8(),
            _ => break,
        }
    }
    for _ in 0..WORD_GRACE {
        match text[hi..].chars().next() {
            Some(c) if !c.is_whitespace() => hi += c.len_utf8(),
            _ => break,
        }
    }

    let mut excerpt = String::with_capacity(hi - lo + 2 * ELLIPSIS.len() + 2);
    if lo > 0 {
        excerpt.push_str(ELLIPSIS);
    }
    excerpt.push_str(&text[lo..start]);
    excerpt.push(SPAN_MARK);
    excerpt.push_str(&text[start..stop]);
    excerpt.push(SPAN_MARK);
    excerpt.push_str(&text[stop..hi]);
    if hi < len {
        excerpt.push_str(ELLIPSIS);
    }
    excerpt
}

/// Largest char boundary at or below `index`.
pub(crate) fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Smallest char boundary at or above `index`.
pub(crate) fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
