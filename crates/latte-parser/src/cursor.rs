//! Cursor over the elements of one line of the element tree.

use latte_core::{ParseErrorKind, Span, SyntaxError};
use latte_scanner::{Delimiter, Element, ElementTree, Line, Token, TokenKind};

/// A bracket pair and the layer between its delimiters.
#[derive(Debug, Clone, Copy)]
pub struct Group<'t, 'ast> {
    pub content: Option<&'t ElementTree<'ast>>,
    pub span: Span,
}

impl<'t, 'ast> Group<'t, 'ast> {
    /// Lines inside the pair; each one is an entry.
    pub fn lines(&self) -> &'t [Line<'ast>] {
        self.content.map(|tree| tree.lines.as_slice()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }
}

pub struct ElementCursor<'t, 'ast> {
    elements: &'t [Element<'ast>],
    pos: usize,
    last_span: Span,
}

impl<'t, 'ast> ElementCursor<'t, 'ast> {
    pub fn new(elements: &'t [Element<'ast>]) -> Self {
        let last_span = elements.first().map(Element::span).unwrap_or_default();
        Self {
            elements,
            pos: 0,
            last_span,
        }
    }

    pub fn of_line(line: &'t Line<'ast>) -> Self {
        Self::new(&line.elements)
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.elements.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<&'t Element<'ast>> {
        self.elements.get(self.pos)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&'t Element<'ast>> {
        self.elements.get(self.pos + n)
    }

    pub fn peek_token(&self) -> Option<&'t Token<'ast>> {
        self.peek().and_then(Element::as_token)
    }

    pub fn peek_token_nth(&self, n: usize) -> Option<&'t Token<'ast>> {
        self.peek_nth(n).and_then(Element::as_token)
    }

    pub fn advance(&mut self) -> Option<&'t Element<'ast>> {
        let element = self.elements.get(self.pos)?;
        self.pos += 1;
        self.last_span = element.span();
        Some(element)
    }

    /// Span of the next element, or of the last one consumed at the end.
    pub fn span(&self) -> Span {
        self.peek().map(Element::span).unwrap_or(self.last_span)
    }

    pub fn last_span(&self) -> Span {
        self.last_span
    }

    /// Remaining elements.
    pub fn rest(&self) -> &'t [Element<'ast>] {
        &self.elements[self.pos.min(self.elements.len())..]
    }

    // =========================================
    // Token checks
    // =========================================

    pub fn check_symbol(&self, symbol: &str) -> bool {
        self.peek_token().is_some_and(|t| t.is_symbol(symbol))
    }

    pub fn check_keyword(&self, keyword: &str) -> bool {
        self.peek_token().is_some_and(|t| t.is_keyword(keyword))
    }

    pub fn check_kind(&self, kind: TokenKind) -> bool {
        self.peek_token().is_some_and(|t| t.kind == kind)
    }

    pub fn check_open(&self, delimiter: Delimiter) -> bool {
        self.check_kind(TokenKind::Open(delimiter))
    }

    pub fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.check_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_separator(&mut self) -> bool {
        if self.check_kind(TokenKind::Separator) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_symbol(&mut self, symbol: &str) -> Result<Token<'ast>, SyntaxError> {
        match self.peek_token() {
            Some(t) if t.is_symbol(symbol) => {
                let t = *t;
                self.advance();
                Ok(t)
            }
            _ => Err(self.error(ParseErrorKind::ExpectedToken, format!("expected '{symbol}'"))),
        }
    }

    pub fn expect_name(&mut self) -> Result<Token<'ast>, SyntaxError> {
        match self.peek_token() {
            Some(t) if t.kind == TokenKind::Name => {
                let t = *t;
                self.advance();
                Ok(t)
            }
            _ => Err(self.error(ParseErrorKind::ExpectedIdentifier, "expected a name")),
        }
    }

    /// Fail unless every element was consumed.
    pub fn expect_end(&self) -> Result<(), SyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(Element::Layer(_)) => Err(self.error(ParseErrorKind::UnexpectedToken, "unexpected block")),
            Some(Element::Token(t)) => Err(self.error(
                ParseErrorKind::UnexpectedToken,
                format!("unexpected '{}'", t.text),
            )),
        }
    }

    pub fn error(&self, kind: ParseErrorKind, message: impl Into<String>) -> SyntaxError {
        let kind = if self.is_at_end() && kind == ParseErrorKind::ExpectedToken {
            ParseErrorKind::UnexpectedEnd
        } else {
            kind
        };
        SyntaxError::parse(kind, message, self.span())
    }

    // =========================================
    // Pairs and layers
    // =========================================

    /// Consume `open [layer] close` if the next token opens `delimiter`.
    pub fn eat_group(&mut self, delimiter: Delimiter) -> Result<Option<Group<'t, 'ast>>, SyntaxError> {
        if !self.check_open(delimiter) {
            return Ok(None);
        }
        let open = self.span();
        self.advance();
        let content = match self.peek() {
            Some(Element::Layer(layer)) => {
                self.advance();
                Some(layer)
            }
            _ => None,
        };
        match self.peek_token() {
            Some(t) if t.kind == TokenKind::Close(delimiter) => {
                let close = t.span;
                self.advance();
                Ok(Some(Group {
                    content,
                    span: open.to(close),
                }))
            }
            _ => Err(self.error(
                ParseErrorKind::ExpectedToken,
                format!("expected '{}'", delimiter.close()),
            )),
        }
    }

    pub fn expect_group(&mut self, delimiter: Delimiter) -> Result<Group<'t, 'ast>, SyntaxError> {
        match self.eat_group(delimiter)? {
            Some(group) => Ok(group),
            None => Err(self.error(
                ParseErrorKind::ExpectedToken,
                format!("expected '{}'", delimiter.open()),
            )),
        }
    }

    /// Number of elements the group starting at the cursor occupies, if the
    /// next token opens one.
    pub fn group_len(&self) -> Option<usize> {
        let open = match self.peek_token()?.kind {
            TokenKind::Open(d) => d,
            _ => return None,
        };
        let has_layer = matches!(self.peek_nth(1), Some(Element::Layer(_)));
        let close_at = if has_layer { 2 } else { 1 };
        match self.peek_token_nth(close_at) {
            Some(t) if t.kind == TokenKind::Close(open) => Some(close_at + 1),
            _ => None,
        }
    }

    /// A layer that is the last element of the line: a block body.
    pub fn eat_block(&mut self) -> Option<&'t ElementTree<'ast>> {
        match self.peek() {
            Some(Element::Layer(layer)) if self.pos + 1 == self.elements.len() => {
                self.advance();
                Some(layer)
            }
            _ => None,
        }
    }

    pub fn check_block(&self) -> bool {
        matches!(self.peek(), Some(Element::Layer(_))) && self.pos + 1 == self.elements.len()
    }
}
