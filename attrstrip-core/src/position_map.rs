//! Mapping from edited output back to the original text.
//!
//! An edit that only deletes ranges leaves the output as a sequence of
//! retained segments, each a verbatim copy of some original range. The map
//! stores those segments; every output offset falls in exactly one of them.

use sourcemap::{SourceMap, SourceMapBuilder};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A run of output text copied verbatim from the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    pub generated_start: usize,
    pub original_start: usize,
    pub len: usize,
}

impl Segment {
    pub fn generated_end(&self) -> usize {
        self.generated_start + self.len
    }

    pub fn original_end(&self) -> usize {
        self.original_start + self.len
    }
}

/// Byte-accurate map from output offsets to original offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionMap {
    segments: Vec<Segment>,
}

impl PositionMap {
    /// Map for an output identical to its `len`-byte input.
    pub fn identity(len: usize) -> Self {
        let mut map = Self::default();
        map.push_segment(0, len);
        map
    }

    /// Append the next retained original range. Segments must be pushed in
    /// output order; a range contiguous with the previous one extends it.
    pub(crate) fn push_segment(&mut self, original_start: usize, len: usize) {
        if len == 0 {
            return;
        }
        let generated_start = self.generated_len();
        if let Some(last) = self.segments.last_mut()
            && last.original_end() == original_start
        {
            last.len += len;
            return;
        }
        self.segments.push(Segment {
            generated_start,
            original_start,
            len,
        });
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Length of the output this map describes.
    pub fn generated_len(&self) -> usize {
        self.segments.last().map_or(0, Segment::generated_end)
    }

    /// The original offset of the output byte at `generated`, or `None` past
    /// the end of the output.
    pub fn original_offset(&self, generated: usize) -> Option<usize> {
        let idx = self
            .segments
            .partition_point(|s| s.generated_start <= generated)
            .checked_sub(1)?;
        let segment = &self.segments[idx];
        (generated < segment.generated_end())
            .then(|| segment.original_start + (generated - segment.generated_start))
    }

    /// Like [`original_offset`](Self::original_offset), but offsets at or past
    /// the end of the output clamp to the end of the last retained segment.
    pub fn nearest_original_offset(&self, generated: usize) -> usize {
        match self.original_offset(generated) {
            Some(offset) => offset,
            None => self.segments.last().map_or(0, Segment::original_end),
        }
    }

    /// The output offset of the original byte at `original`, or `None` if
    /// that byte was removed.
    pub fn generated_offset(&self, original: usize) -> Option<usize> {
        let idx = self
            .segments
            .partition_point(|s| s.original_start <= original)
            .checked_sub(1)?;
        let segment = &self.segments[idx];
        (original < segment.original_end())
            .then(|| segment.generated_start + (original - segment.original_start))
    }

    /// Render as a Source Map v3 with one token per retained character.
    ///
    /// `original` must be the text this map was built against. Columns are
    /// counted in UTF-16 code units.
    pub fn to_source_map(
        &self,
        file: Option<&str>,
        source_name: &str,
        original: &str,
    ) -> SourceMap {
        let mut builder = SourceMapBuilder::new(file.map(Into::into));
        let source_id = builder.add_source(source_name.into());
        builder.set_source_contents(source_id, Some(original.into()));

        let mut generated = LineCursor::default();
        let mut source = LineCursor::default();

        for segment in &self.segments {
            source.advance_to(original, segment.original_start);
            for ch in original[segment.original_start..segment.original_end()].chars() {
                builder.add_raw(
                    generated.line,
                    generated.column,
                    source.line,
                    source.column,
                    Some(source_id),
                    None,
                    false,
                );
                generated.step(ch);
                source.step(ch);
            }
        }

        builder.into_sourcemap()
    }
}

/// Line/column tracker that only moves forward.
#[derive(Debug, Default)]
struct LineCursor {
    offset: usize,
    line: u32,
    column: u32,
}

impl LineCursor {
    fn step(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += ch.len_utf16() as u32;
        }
    }

    fn advance_to(&mut self, text: &str, offset: usize) {
        if offset > self.offset {
            for ch in text[self.offset..offset].chars() {
                self.step(ch);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_segment_map() -> PositionMap {
        // original: "abcXYZdef", "XYZ" removed -> output "abcdef"
        let mut map = PositionMap::default();
        map.push_segment(0, 3);
        map.push_segment(6, 3);
        map
    }

    #[test]
    fn maps_output_offsets_into_retained_segments() {
        let map = two_segment_map();
        assert_eq!(map.generated_len(), 6);
        assert_eq!(map.original_offset(0), Some(0));
        assert_eq!(map.original_offset(2), Some(2));
        assert_eq!(map.original_offset(3), Some(6));
        assert_eq!(map.original_offset(5), Some(8));
        assert_eq!(map.original_offset(6), None);
    }

    #[test]
    fn nearest_clamps_past_the_end() {
        let map = two_segment_map();
        assert_eq!(map.nearest_original_offset(6), 9);
        assert_eq!(map.nearest_original_offset(100), 9);
        assert_eq!(PositionMap::default().nearest_original_offset(0), 0);
    }

    #[test]
    fn removed_bytes_have_no_generated_offset() {
        let map = two_segment_map();
        assert_eq!(map.generated_offset(1), Some(1));
        assert_eq!(map.generated_offset(4), None);
        assert_eq!(map.generated_offset(7), Some(4));
    }

    #[test]
    fn contiguous_segments_merge() {
        let mut map = PositionMap::default();
        map.push_segment(0, 2);
        map.push_segment(2, 3);
        map.push_segment(5, 0);
        assert_eq!(
            map.segments(),
            &[Segment {
                generated_start: 0,
                original_start: 0,
                len: 5
            }]
        );
        assert_eq!(map, PositionMap::identity(5));
    }

    #[test]
    fn source_map_tracks_lines_and_columns() {
        // original "a\nXb" with "X" removed -> "a\nb"
        let original = "a\nXb";
        let mut map = PositionMap::default();
        map.push_segment(0, 2);
        map.push_segment(3, 1);

        let sm = map.to_source_map(Some("out.svelte"), "in.svelte", original);
        assert_eq!(sm.get_source(0), Some("in.svelte"));

        let b = sm.lookup_token(1, 0).expect("token for 'b'");
        assert_eq!(b.get_src_line(), 1);
        assert_eq!(b.get_src_col(), 1);

        let a = sm.lookup_token(0, 0).expect("token for 'a'");
        assert_eq!((a.get_src_line(), a.get_src_col()), (0, 0));
    }
}
