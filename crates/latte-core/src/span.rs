//! Source positions attached to tokens, AST nodes and diagnostics.

use std::fmt;

/// Where something starts in a source unit, plus how many bytes it covers.
///
/// Positions are 1-indexed. Spans never take part in element-tree or AST
/// equality; two trees that differ only in their spans are the same program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes on the starting line.
    pub len: u32,
}

impl Span {
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Extend `self` so it also covers `other`.
    ///
    /// When the spans sit on different lines the result keeps the first
    /// position and only approximates the length.
    pub fn to(self, other: Span) -> Span {
        let (first, last) = if (other.line, other.col) < (self.line, self.col) {
            (other, self)
        } else {
            (self, other)
        };

        if first.line == last.line {
            let end = (last.col + last.len).max(first.col + first.len);
            Span::new(first.line, first.col, end - first.col)
        } else {
            Span::new(first.line, first.col, first.len + last.len)
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_is_empty() {
        assert!(Span::point(4, 2).is_empty());
        assert!(!Span::new(4, 2, 3).is_empty());
    }

    #[test]
    fn display_is_line_colon_col() {
        assert_eq!(Span::new(12, 7, 1).to_string(), "12:7");
    }

    #[test]
    fn to_covers_both_on_one_line() {
        let class_kw = Span::new(1, 1, 5);
        let name = Span::new(1, 7, 1);
        assert_eq!(class_kw.to(name), Span::new(1, 1, 7));
        assert_eq!(name.to(class_kw), Span::new(1, 1, 7));
    }

    #[test]
    fn to_across_lines_keeps_first_position() {
        let head = Span::new(2, 5, 4);
        let tail = Span::new(6, 1, 3);
        let joined = tail.to(head);
        assert_eq!((joined.line, joined.col, joined.len), (2, 5, 7));
    }
}
