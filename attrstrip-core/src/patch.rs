//! Removal of byte ranges from a text in one pass.

use std::borrow::Cow;

use crate::position_map::PositionMap;
use crate::span::Span;

/// A span list the patcher refuses to apply. Any of these means the spans
/// came from a broken parser or collector, never from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("span {start}..{end} is inverted")]
    Inverted { start: usize, end: usize },

    #[error("span {start}..{end} is out of bounds for text of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("span {start}..{end} does not fall on character boundaries")]
    NotCharBoundary { start: usize, end: usize },

    #[error("span {start}..{end} comes after a span starting at {previous_start}")]
    Unsorted {
        start: usize,
        end: usize,
        previous_start: usize,
    },

    #[error("span {start}..{end} overlaps a span ending at {previous_end}")]
    Overlapping {
        start: usize,
        end: usize,
        previous_end: usize,
    },
}

/// The text after removal, plus an optional map back to the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult<'a> {
    /// Borrowed from the input when nothing was removed.
    pub code: Cow<'a, str>,
    pub map: Option<PositionMap>,
}

impl<'a> EditResult<'a> {
    /// The input, unchanged.
    pub fn unchanged(text: &'a str, want_map: bool) -> Self {
        Self {
            code: Cow::Borrowed(text),
            map: want_map.then(|| PositionMap::identity(text.len())),
        }
    }

    /// Whether any text was removed.
    pub fn is_modified(&self) -> bool {
        matches!(self.code, Cow::Owned(_))
    }
}

/// Check that `spans` are in bounds, on char boundaries, ascending and
/// pairwise disjoint.
pub fn check_spans(text: &str, spans: &[Span]) -> Result<(), PatchError> {
    let mut previous: Option<&Span> = None;
    for span in spans {
        let (start, end) = (span.start, span.end);
        if start > end {
            return Err(PatchError::Inverted { start, end });
        }
        if end > text.len() {
            return Err(PatchError::OutOfBounds {
                start,
                end,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(PatchError::NotCharBoundary { start, end });
        }
        if let Some(prev) = previous {
            if start < prev.start {
                return Err(PatchError::Unsorted {
                    start,
                    end,
                    previous_start: prev.start,
                });
            }
            if start < prev.end {
                return Err(PatchError::Overlapping {
                    start,
                    end,
                    previous_end: prev.end,
                });
            }
        }
        previous = Some(span);
    }
    Ok(())
}

/// Remove `spans` from `text`.
///
/// The output is built in a single left-to-right pass: every gap between
/// consecutive spans is copied once, so the cost is linear in the text
/// length plus the number of spans. When `want_map` is set, the retained
/// segments are also recorded as a [`PositionMap`].
pub fn apply<'a>(
    text: &'a str,
    spans: &[Span],
    want_map: bool,
) -> Result<EditResult<'a>, PatchError> {
    check_spans(text, spans)?;

    let removed: usize = spans.iter().map(|s| s.end - s.start).sum();
    if removed == 0 {
        return Ok(EditResult::unchanged(text, want_map));
    }

    let mut code = String::with_capacity(text.len() - removed);
    let mut map = want_map.then(PositionMap::default);
    let mut cursor = 0;

    for span in spans.iter().chain(std::iter::once(&(text.len()..text.len()))) {
        if span.start > cursor {
            if let Some(map) = map.as_mut() {
                map.push_segment(cursor, span.start - cursor);
            }
            code.push_str(&text[cursor..span.start]);
        }
        cursor = span.end;
    }

    Ok(EditResult {
        code: Cow::Owned(code),
        map,
    })
}
