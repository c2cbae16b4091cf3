//! Byte offsets to editor positions and back.
//!
//! Editors address text by zero-based line and UTF-16 code unit within the
//! line. Ranges are half-open `[start, end)`.

use serde::Serialize;

use crate::helpers::ByteRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

/// Line start table over one text snapshot.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    /// Position of byte `offset`, clamped to the text.
    pub fn position(&self, offset: usize) -> Position {
        let offset = self.floor_boundary(offset.min(self.text.len()));
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let start = self.line_starts[line];
        let character: usize = self.text[start..offset].chars().map(char::len_utf16).sum();
        Position {
            line: line as u32,
            character: character as u32,
        }
    }

    pub fn range(&self, range: ByteRange) -> TextRange {
        TextRange {
            start: self.position(range.start),
            end: self.position(range.end),
        }
    }

    /// Byte offset of `position`. A character past the end of its line maps
    /// to the line end; a line past the end of the text is `None`.
    pub fn offset(&self, position: Position) -> Option<usize> {
        let line = position.line as usize;
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |&next| next - 1);

        let mut units = 0usize;
        for (i, ch) in self.text[start..end].char_indices() {
            if units >= position.character as usize {
                return Some(start + i);
            }
            units += ch.len_utf16();
        }
        Some(end)
    }

    fn floor_boundary(&self, mut offset: usize) -> usize {
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    #[test]
    fn positions_across_lines() {
        let text = "ab\ncd\n\nef";
        let index = LineIndex::new(text);
        assert_eq!(index.position(0), pos(0, 0));
        assert_eq!(index.position(2), pos(0, 2));
        assert_eq!(index.position(3), pos(1, 0));
        assert_eq!(index.position(6), pos(2, 0));
        assert_eq!(index.position(8), pos(3, 1));
        assert_eq!(index.position(100), pos(3, 2));
    }

    #[test]
    fn utf16_columns() {
        // 'é' is 2 bytes / 1 unit, '😀' is 4 bytes / 2 units.
        let text = "é😀x";
        let index = LineIndex::new(text);
        let x = text.find('x').unwrap();
        assert_eq!(index.position(x), pos(0, 3));
        assert_eq!(index.offset(pos(0, 3)), Some(x));
        assert_eq!(index.offset(pos(0, 1)), Some(2));
    }

    #[test]
    fn offset_clamps_to_line_end() {
        let text = "abc\ndef";
        let index = LineIndex::new(text);
        assert_eq!(index.offset(pos(0, 99)), Some(3));
        assert_eq!(index.offset(pos(1, 1)), Some(5));
        assert_eq!(index.offset(pos(1, 99)), Some(7));
        assert_eq!(index.offset(pos(5, 0)), None);
    }

    #[test]
    fn range_roundtrip() {
        let text = "line one\n  {{count}}\n";
        let index = LineIndex::new(text);
        let start = text.find("count").unwrap();
        let range = index.range(start..start + 5);
        assert_eq!(range.start, pos(1, 4));
        assert_eq!(range.end, pos(1, 9));
        assert_eq!(index.offset(range.start), Some(start));
    }

    #[test]
    fn offset_inside_multibyte_char_floors() {
        let text = "é";
        let index = LineIndex::new(text);
        assert_eq!(index.position(1), pos(0, 0));
    }
}
