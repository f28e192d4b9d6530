/// A cursor over source text that tracks line and column.
///
/// Provides peek/advance access to characters plus a few helpers for the
/// things Latte scanning needs: indentation prefixes and symbol prefixes.
pub struct Cursor<'src> {
    source: &'src str,
    /// Remaining source text.
    rest: &'src str,
    offset: u32,
    line: u32,
    column: u32,
}

/// Leading whitespace of a physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Indent {
    /// Number of whitespace characters, tabs and spaces counted alike.
    pub width: u32,
    pub has_tabs: bool,
    pub has_spaces: bool,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
        Self {
            source,
            rest: source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[inline]
    pub fn peek(&self) -> Option<char> {
        let first = *self.rest.as_bytes().first()?;
        if first < 128 {
            Some(first as char)
        } else {
            self.rest.chars().next()
        }
    }

    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    #[inline]
    pub fn check(&self, f: impl Fn(char) -> bool) -> bool {
        self.peek().is_some_and(f)
    }

    #[inline]
    pub fn check_str(&self, s: &str) -> bool {
        self.rest.starts_with(s)
    }

    /// The not-yet-consumed text.
    #[inline]
    pub fn rest(&self) -> &'src str {
        self.rest
    }

    /// Consume one character, updating line and column.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        let len = ch.len_utf8();
        self.rest = &self.rest[len..];
        self.offset += len as u32;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += len as u32;
        }
        Some(ch)
    }

    /// Consume `n` bytes known to contain no newline.
    pub fn advance_bytes(&mut self, n: usize) {
        debug_assert!(self.rest.is_char_boundary(n));
        debug_assert!(!self.rest[..n].contains('\n'));
        self.rest = &self.rest[n..];
        self.offset += n as u32;
        self.column += n as u32;
    }

    pub fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume characters while the predicate matches and return them.
    pub fn eat_while(&mut self, f: impl Fn(char) -> bool) -> &'src str {
        let start = self.offset as usize;
        while self.check(&f) {
            self.advance();
        }
        &self.source[start..self.offset as usize]
    }

    /// Source text between a previous offset and the current position.
    pub fn slice_from(&self, start: u32) -> &'src str {
        &self.source[start as usize..self.offset as usize]
    }

    /// Consume the indentation at the start of a line.
    pub fn eat_indent(&mut self) -> Indent {
        let prefix = self.eat_while(|c| c == ' ' || c == '\t');
        Indent {
            width: prefix.chars().count() as u32,
            has_tabs: prefix.contains('\t'),
            has_spaces: prefix.contains(' '),
        }
    }

    /// Skip to the end of the line without consuming the newline.
    pub fn skip_line(&mut self) {
        let len = self.rest.find('\n').unwrap_or(self.rest.len());
        self.advance_bytes(len);
    }
}

/// `[A-Za-z_$]`
#[inline]
pub fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

/// `[A-Za-z0-9_$]`
#[inline]
pub fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.advance();
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (1, 3));
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (2, 1));
        assert_eq!(cursor.peek(), Some('c'));
    }

    #[test]
    fn eats_indentation() {
        let mut cursor = Cursor::new("\t  x");
        let indent = cursor.eat_indent();
        assert_eq!(indent.width, 3);
        assert!(indent.has_tabs && indent.has_spaces);
        assert_eq!(cursor.peek(), Some('x'));
    }

    #[test]
    fn skips_byte_order_mark() {
        let cursor = Cursor::new("\u{FEFF}class");
        assert_eq!(cursor.peek(), Some('c'));
    }

    #[test]
    fn skip_line_stops_at_newline() {
        let mut cursor = Cursor::new("// comment\nx");
        cursor.skip_line();
        assert_eq!(cursor.peek(), Some('\n'));
    }
}
