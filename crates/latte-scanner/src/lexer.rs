//! Line-aware tokenizer shared by both layout normalizers.
//!
//! The [`Lexer`] turns source text into a stream of [`Lexeme`]s: tokens,
//! plus a [`Lexeme::LineStart`] marker carrying the indentation of every
//! physical line that holds at least one token. Blank lines and comment-only
//! lines produce nothing. What a line start *means* is up to the normalizer.
//!
//! All token text is copied into the arena, so the source string can be
//! dropped once scanning is done.

use bumpalo::Bump;
use latte_core::{Span, SyntaxError};

use crate::cursor::{Cursor, Indent, is_name_continue, is_name_start};
use crate::token::{Delimiter, Token, TokenKind, classify_word, match_symbol};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lexeme<'ast> {
    /// The next token is the first one on its physical line.
    LineStart { indent: Indent, span: Span },
    Token(Token<'ast>),
}

pub struct Lexer<'src, 'ast> {
    cursor: Cursor<'src>,
    arena: &'ast Bump,
    at_line_start: bool,
    /// Indentation of the current line, until its first token is emitted.
    pending_indent: Option<Indent>,
    /// Token held back while its line start is reported.
    queued: Option<Token<'ast>>,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            at_line_start: true,
            pending_indent: None,
            queued: None,
        }
    }

    /// The next lexeme, or `None` at end of input.
    pub fn next_lexeme(&mut self) -> Result<Option<Lexeme<'ast>>, SyntaxError> {
        if let Some(token) = self.queued.take() {
            return Ok(Some(Lexeme::Token(token)));
        }

        loop {
            if self.at_line_start {
                self.pending_indent = Some(self.cursor.eat_indent());
                self.at_line_start = false;
            }
            self.cursor.eat_while(|c| c == ' ' || c == '\t' || c == '\r');

            match self.cursor.peek() {
                None => return Ok(None),
                Some('\n') => {
                    self.cursor.advance();
                    self.at_line_start = true;
                    continue;
                }
                Some('/') if self.cursor.check_str("//") => {
                    self.cursor.skip_line();
                    continue;
                }
                Some('/') if self.cursor.check_str("/*") => {
                    self.skip_block_comment()?;
                    continue;
                }
                Some(_) => {}
            }

            let token = self.scan_token()?;
            if let Some(indent) = self.pending_indent.take() {
                self.queued = Some(token);
                let span = Span::new(token.span.line, 1, indent.width);
                return Ok(Some(Lexeme::LineStart { indent, span }));
            }
            return Ok(Some(Lexeme::Token(token)));
        }
    }

    // =========================================
    // Internal: token scanning
    // =========================================

    fn scan_token(&mut self) -> Result<Token<'ast>, SyntaxError> {
        let line = self.cursor.line();
        let col = self.cursor.column();
        let start = self.cursor.offset();

        let Some(c) = self.cursor.peek() else {
            return Err(SyntaxError::UnexpectedChar {
                ch: '\0',
                span: Span::point(line, col),
            });
        };

        let delimiter = |d: Delimiter, open: bool| if open { TokenKind::Open(d) } else { TokenKind::Close(d) };
        let single = match c {
            '(' => Some(delimiter(Delimiter::Paren, true)),
            ')' => Some(delimiter(Delimiter::Paren, false)),
            '[' => Some(delimiter(Delimiter::Bracket, true)),
            ']' => Some(delimiter(Delimiter::Bracket, false)),
            '{' => Some(delimiter(Delimiter::Brace, true)),
            '}' => Some(delimiter(Delimiter::Brace, false)),
            ',' | ';' => Some(TokenKind::Separator),
            _ => None,
        };
        if let Some(kind) = single {
            self.cursor.advance();
            return Ok(self.make_token(kind, line, col, start));
        }

        match c {
            '"' | '\'' => self.scan_string(c, line, col, start),
            '`' => self.scan_quoted_name(line, col, start),
            c if c.is_ascii_digit() => self.scan_number(line, col, start),
            c if is_name_start(c) => {
                let word = self.cursor.eat_while(is_name_continue);
                let kind = classify_word(word);
                Ok(self.make_token(kind, line, col, start))
            }
            _ => match match_symbol(self.cursor.rest()) {
                Some(symbol) => {
                    self.cursor.advance_bytes(symbol.len());
                    Ok(self.make_token(TokenKind::Symbol, line, col, start))
                }
                None => Err(SyntaxError::UnexpectedChar {
                    ch: c,
                    span: Span::new(line, col, c.len_utf8() as u32),
                }),
            },
        }
    }

    /// Token whose text is the source slice from `start`.
    fn make_token(&self, kind: TokenKind, line: u32, col: u32, start: u32) -> Token<'ast> {
        let text = self.cursor.slice_from(start);
        let span = Span::new(line, col, text.len() as u32);
        Token::new(kind, self.arena.alloc_str(text), span)
    }

    fn skip_block_comment(&mut self) -> Result<(), SyntaxError> {
        let span = Span::new(self.cursor.line(), self.cursor.column(), 2);
        self.cursor.advance_bytes(2);
        loop {
            if self.cursor.check_str("*/") {
                self.cursor.advance_bytes(2);
                return Ok(());
            }
            if self.cursor.advance().is_none() {
                return Err(SyntaxError::UnterminatedComment { span });
            }
        }
    }

    /// Single-line string with backslash escapes. The token text is the
    /// unescaped content.
    fn scan_string(&mut self, quote: char, line: u32, col: u32, start: u32) -> Result<Token<'ast>, SyntaxError> {
        self.cursor.advance();
        let mut content = bumpalo::collections::String::new_in(self.arena);

        loop {
            let unterminated = || SyntaxError::UnterminatedString {
                span: Span::point(line, col),
            };
            match self.cursor.advance() {
                None | Some('\n') => return Err(unterminated()),
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escaped = match self.cursor.advance() {
                        None | Some('\n') => return Err(unterminated()),
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some(other) => other,
                    };
                    content.push(escaped);
                }
                Some(c) => content.push(c),
            }
        }

        let len = self.cursor.offset() - start;
        Ok(Token::new(TokenKind::Str, content.into_bump_str(), Span::new(line, col, len)))
    }

    fn scan_quoted_name(&mut self, line: u32, col: u32, start: u32) -> Result<Token<'ast>, SyntaxError> {
        self.cursor.advance();
        let name = self.cursor.eat_while(|c| c != '`' && c != '\n');
        if !self.cursor.eat('`') || name.is_empty() {
            return Err(SyntaxError::UnterminatedString {
                span: Span::point(line, col),
            });
        }
        let len = self.cursor.offset() - start;
        Ok(Token::new(TokenKind::Name, self.arena.alloc_str(name), Span::new(line, col, len)))
    }

    /// Decimal, hex, fractional and exponent forms, with an optional
    /// `L`/`F`/`D` suffix. `1.5` is one token; `a.1` is not a number.
    fn scan_number(&mut self, line: u32, col: u32, start: u32) -> Result<Token<'ast>, SyntaxError> {
        if self.cursor.check_str("0x") || self.cursor.check_str("0X") {
            self.cursor.advance_bytes(2);
            let digits = self.cursor.eat_while(|c| c.is_ascii_hexdigit() || c == '_');
            if digits.is_empty() {
                return Err(self.invalid_number(line, col, start, "missing hex digits"));
            }
        } else {
            self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
            if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
                self.cursor.advance();
                self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
            }
            if self.cursor.check(|c| c == 'e' || c == 'E') {
                let signed = matches!(self.cursor.peek_nth(1), Some('+') | Some('-'));
                let digit_at = if signed { 2 } else { 1 };
                if self.cursor.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    self.cursor.advance();
                    if signed {
                        self.cursor.advance();
                    }
                    self.cursor.eat_while(|c| c.is_ascii_digit());
                }
            }
        }

        if self.cursor.check(|c| matches!(c, 'l' | 'L' | 'f' | 'F' | 'd' | 'D')) {
            self.cursor.advance();
        }
        if self.cursor.check(is_name_continue) {
            self.cursor.eat_while(is_name_continue);
            return Err(self.invalid_number(line, col, start, "unexpected character in number"));
        }
        Ok(self.make_token(TokenKind::Number, line, col, start))
    }

    fn invalid_number(&self, line: u32, col: u32, start: u32, detail: &str) -> SyntaxError {
        SyntaxError::InvalidNumber {
            span: Span::new(line, col, self.cursor.offset() - start),
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<String> {
        let arena = Bump::new();
        let mut lexer = Lexer::new(source, &arena);
        let mut out = Vec::new();
        while let Some(lexeme) = lexer.next_lexeme().unwrap() {
            out.push(match lexeme {
                Lexeme::LineStart { indent, .. } => format!("<{}>", indent.width),
                Lexeme::Token(t) => t.text.to_string(),
            });
        }
        out
    }

    fn lex_err(source: &str) -> SyntaxError {
        let arena = Bump::new();
        let mut lexer = Lexer::new(source, &arena);
        loop {
            match lexer.next_lexeme() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected an error for {source:?}"),
                Err(e) => return e,
            }
        }
    }

    #[test]
    fn reports_line_starts_with_indentation() {
        assert_eq!(lex("a\n    b c\n\n  d"), vec!["<0>", "a", "<4>", "b", "c", "<2>", "d"]);
    }

    #[test]
    fn comment_only_lines_are_invisible() {
        assert_eq!(lex("/// :scanner-brace\n// x\na /* b */ c\n   /* multi\nline */"), vec!["<0>", "a", "c"]);
    }

    #[test]
    fn longest_symbols() {
        assert_eq!(lex("a::b->c:::d"), vec!["<0>", "a", "::", "b", "->", "c", ":::", "d"]);
        assert_eq!(lex("i+=1"), vec!["<0>", "i", "+=", "1"]);
    }

    #[test]
    fn numbers() {
        assert_eq!(lex("1.5 2 3e10 0xFF 10L a.b"), vec!["<0>", "1.5", "2", "3e10", "0xFF", "10L", "a", ".", "b"]);
        assert_eq!(lex("x.1"), vec!["<0>", "x", ".", "1"]);
    }

    #[test]
    fn strings_are_unescaped() {
        assert_eq!(lex(r#""a\"b" 'c\n'"#), vec!["<0>", "a\"b", "c\n"]);
    }

    #[test]
    fn quoted_names() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("`class`", &arena);
        lexer.next_lexeme().unwrap();
        match lexer.next_lexeme().unwrap() {
            Some(Lexeme::Token(t)) => {
                assert_eq!(t.kind, TokenKind::Name);
                assert_eq!(t.text, "class");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn errors() {
        assert!(matches!(lex_err("\"abc"), SyntaxError::UnterminatedString { .. }));
        assert!(matches!(lex_err("'abc\n'"), SyntaxError::UnterminatedString { .. }));
        assert!(matches!(lex_err("/* never closed"), SyntaxError::UnterminatedComment { .. }));
        assert!(matches!(lex_err("12ab"), SyntaxError::InvalidNumber { .. }));
        assert!(matches!(lex_err("a \\ b"), SyntaxError::UnexpectedChar { ch: '\\', .. }));
    }
}
