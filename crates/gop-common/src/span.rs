use std::ops::Range;

use serde::Serialize;

/// Byte-offset span into source text. Start is inclusive, end is exclusive.
///
/// Positions handed over by the parser are byte offsets into the original
/// file. Line/column pairs are computed on demand through [`LineIndex`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// A zero-length span at `offset`.
    pub fn at(offset: u32) -> Self {
        Self { start: offset, end: offset }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The last byte of the span, used to point at closing braces.
    pub fn end_point(self) -> Span {
        Span::new(self.end.saturating_sub(1).max(self.start), self.end)
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Convert to a `usize` range for renderers that index source text.
    pub fn to_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// Pre-computed index of line start positions.
///
/// Built once per source file; offsets are mapped to 1-based (line, column)
/// pairs by binary search.
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a 1-based (line, column) pair. Columns count bytes.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line = (line_idx as u32) + 1;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both() {
        let merged = Span::new(5, 10).merge(Span::new(8, 15));
        assert_eq!(merged, Span::new(5, 15));
    }

    #[test]
    fn end_point_is_last_byte() {
        assert_eq!(Span::new(4, 9).end_point(), Span::new(8, 9));
        assert_eq!(Span::at(3).end_point(), Span::at(3));
    }

    #[test]
    fn to_range_and_contains() {
        let span = Span::new(2, 6);
        assert_eq!(span.to_range(), 2..6);
        assert!(span.contains(2));
        assert!(!span.contains(6));
        assert_eq!(span.len(), 4);
    }

    #[test]
    fn line_col_across_lines() {
        let idx = LineIndex::new("package p\nvar x = 1\n");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(10), (2, 1));
        assert_eq!(idx.line_col(14), (2, 5));
        assert_eq!(idx.line_count(), 3);
    }
}
