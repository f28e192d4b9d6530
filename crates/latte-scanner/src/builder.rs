//! Frame stack that assembles an [`ElementTree`].
//!
//! Both normalizers drive the same builder; they only differ in what a line
//! start means. Tokens, separators and bracket pairs are handled here so the
//! two syntaxes cannot drift apart.

use latte_core::{Span, SyntaxError};

use crate::token::{Delimiter, Token, TokenKind};
use crate::tree::{Element, ElementTree, Line};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind<'ast> {
    Root,
    /// `( )` or `[ ]`; newlines and `,` separate lines inside.
    Pair(Token<'ast>),
    /// `{ }` block.
    Brace(Span),
    /// Block opened by deeper indentation.
    Indent,
}

struct Frame<'ast> {
    kind: FrameKind<'ast>,
    lines: Vec<Line<'ast>>,
    current: Vec<Element<'ast>>,
}

impl<'ast> Frame<'ast> {
    fn new(kind: FrameKind<'ast>) -> Self {
        Self {
            kind,
            lines: Vec::new(),
            current: Vec::new(),
        }
    }

    fn end_line(&mut self) {
        if !self.current.is_empty() {
            let elements = std::mem::take(&mut self.current);
            self.lines.push(Line::new(elements));
        }
    }

    /// Make the previous line current again so a block can attach to it.
    fn reopen_last_line(&mut self) {
        if self.current.is_empty()
            && let Some(line) = self.lines.pop()
        {
            self.current = line.elements;
        }
    }

    fn into_tree(mut self) -> ElementTree<'ast> {
        self.end_line();
        ElementTree { lines: self.lines }
    }
}

pub struct TreeBuilder<'ast> {
    frames: Vec<Frame<'ast>>,
}

impl<'ast> TreeBuilder<'ast> {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(FrameKind::Root)],
        }
    }

    fn top(&mut self) -> &mut Frame<'ast> {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn top_kind(&self) -> FrameKind<'ast> {
        self.frames[self.frames.len() - 1].kind
    }

    /// Whether indentation is significant at the current position: not
    /// inside a bracket pair or a brace block.
    pub fn at_layout_level(&self) -> bool {
        matches!(self.top_kind(), FrameKind::Root | FrameKind::Indent)
    }

    pub fn end_line(&mut self) {
        self.top().end_line();
    }

    /// Feed one token, handling separators and delimiters.
    pub fn token(&mut self, token: Token<'ast>) -> Result<(), SyntaxError> {
        match token.kind {
            TokenKind::Separator if token.text == ";" => self.end_line(),
            TokenKind::Separator if matches!(self.top_kind(), FrameKind::Pair(_)) => self.end_line(),
            TokenKind::Open(Delimiter::Brace) => self.open_brace(token.span),
            TokenKind::Open(_) => {
                self.top().current.push(Element::Token(token));
                self.frames.push(Frame::new(FrameKind::Pair(token)));
            }
            TokenKind::Close(delimiter) => self.close(delimiter, token)?,
            _ => self.top().current.push(Element::Token(token)),
        }
        Ok(())
    }

    fn open_brace(&mut self, span: Span) {
        self.top().reopen_last_line();
        self.frames.push(Frame::new(FrameKind::Brace(span)));
    }

    fn close(&mut self, delimiter: Delimiter, token: Token<'ast>) -> Result<(), SyntaxError> {
        let expected = match self.top_kind() {
            FrameKind::Pair(open) => match open.kind {
                TokenKind::Open(d) => Some(d),
                _ => None,
            },
            FrameKind::Brace(_) => Some(Delimiter::Brace),
            FrameKind::Root | FrameKind::Indent => None,
        };

        match expected {
            Some(open) if open == delimiter => {}
            Some(open) => {
                return Err(SyntaxError::MismatchedDelimiter {
                    expected: open.close(),
                    found: delimiter.close(),
                    span: token.span,
                });
            }
            None => {
                return Err(SyntaxError::UnexpectedClose {
                    found: delimiter.close(),
                    span: token.span,
                });
            }
        }

        let Some(frame) = self.frames.pop() else {
            return Err(SyntaxError::UnexpectedClose {
                found: delimiter.close(),
                span: token.span,
            });
        };
        let tree = frame.into_tree();
        let parent = self.top();
        if delimiter == Delimiter::Brace {
            if !tree.is_empty() {
                parent.current.push(Element::Layer(tree));
            }
            parent.end_line();
        } else {
            if !tree.is_empty() {
                parent.current.push(Element::Layer(tree));
            }
            parent.current.push(Element::Token(token));
        }
        Ok(())
    }

    /// Start an indented block attached to the line in progress.
    pub fn open_indent_block(&mut self) {
        self.top().reopen_last_line();
        self.frames.push(Frame::new(FrameKind::Indent));
    }

    /// Close the innermost indented block.
    pub fn close_indent_block(&mut self, span: Span) -> Result<(), SyntaxError> {
        if self.top_kind() != FrameKind::Indent {
            return Err(SyntaxError::InconsistentDedent { span });
        }
        let Some(frame) = self.frames.pop() else {
            return Err(SyntaxError::InconsistentDedent { span });
        };
        let tree = frame.into_tree();
        let parent = self.top();
        if !tree.is_empty() {
            parent.current.push(Element::Layer(tree));
        }
        parent.end_line();
        Ok(())
    }

    /// Close any open indented blocks and return the finished tree.
    pub fn finish(mut self) -> Result<ElementTree<'ast>, SyntaxError> {
        while self.frames.len() > 1 {
            match self.top_kind() {
                FrameKind::Indent => {
                    self.top().end_line();
                    self.close_indent_block(Span::default())?;
                }
                FrameKind::Pair(open) => {
                    let ch = match open.kind {
                        TokenKind::Open(d) => d.open(),
                        _ => '(',
                    };
                    return Err(SyntaxError::UnclosedDelimiter { open: ch, span: open.span });
                }
                FrameKind::Brace(span) => {
                    return Err(SyntaxError::UnclosedDelimiter { open: '{', span });
                }
                FrameKind::Root => break,
            }
        }
        let root = self.frames.pop().map(Frame::into_tree).unwrap_or_default();
        Ok(root)
    }
}

impl Default for TreeBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}
