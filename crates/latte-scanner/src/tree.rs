//! The canonical Element Tree.
//!
//! Both surface syntaxes scan to the same shape:
//!
//! - an [`ElementTree`] is an ordered list of [`Line`]s;
//! - a line is an ordered list of [`Element`]s;
//! - an element is a token or a nested layer (a sub-tree).
//!
//! `( )` and `[ ]` stay visible as tokens with their content as a layer in
//! between; a block (`{ }` or an indented body) becomes a layer that is the
//! last element of its header line.
//!
//! Equality ignores spans and indentation: it compares token content and
//! nesting shape only.

use std::fmt;

use latte_core::Span;

use crate::token::Token;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct ElementTree<'ast> {
    pub lines: Vec<Line<'ast>>,
}

#[derive(Clone)]
pub struct Line<'ast> {
    pub elements: Vec<Element<'ast>>,
    /// Position of the first element.
    pub span: Span,
}

#[derive(Clone, PartialEq, Eq)]
pub enum Element<'ast> {
    Token(Token<'ast>),
    Layer(ElementTree<'ast>),
}

impl<'ast> ElementTree<'ast> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[Line<'ast>] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Indentation-agnostic equality. Same as `==`, spelled out for callers
    /// that want to be explicit about what is being compared.
    pub fn equals_ignore_layout(&self, other: &ElementTree<'_>) -> bool {
        self.lines.len() == other.lines.len()
            && self
                .lines
                .iter()
                .zip(&other.lines)
                .all(|(a, b)| a.equals_ignore_layout(b))
    }

    /// Total number of tokens, at every depth.
    pub fn token_count(&self) -> usize {
        self.lines
            .iter()
            .flat_map(|line| &line.elements)
            .map(|element| match element {
                Element::Token(_) => 1,
                Element::Layer(layer) => layer.token_count(),
            })
            .sum()
    }
}

impl<'ast> Line<'ast> {
    pub fn new(elements: Vec<Element<'ast>>) -> Self {
        let span = elements.first().map(Element::span).unwrap_or_default();
        Self { elements, span }
    }

    pub fn elements(&self) -> &[Element<'ast>] {
        &self.elements
    }

    pub fn first_token(&self) -> Option<&Token<'ast>> {
        self.elements.first().and_then(Element::as_token)
    }

    /// The trailing block layer, if the line ends with one.
    pub fn body(&self) -> Option<&ElementTree<'ast>> {
        self.elements.last().and_then(Element::as_layer)
    }

    fn equals_ignore_layout(&self, other: &Line<'_>) -> bool {
        self.elements.len() == other.elements.len()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| match (a, b) {
                    (Element::Token(x), Element::Token(y)) => x.kind == y.kind && x.text == y.text,
                    (Element::Layer(x), Element::Layer(y)) => x.equals_ignore_layout(y),
                    _ => false,
                })
    }
}

impl PartialEq for Line<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.equals_ignore_layout(other)
    }
}

impl Eq for Line<'_> {}

impl<'ast> Element<'ast> {
    pub fn as_token(&self) -> Option<&Token<'ast>> {
        match self {
            Element::Token(t) => Some(t),
            Element::Layer(_) => None,
        }
    }

    pub fn as_layer(&self) -> Option<&ElementTree<'ast>> {
        match self {
            Element::Layer(l) => Some(l),
            Element::Token(_) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Element::Token(t) => t.span,
            Element::Layer(l) => l.lines.first().map(|line| line.span).unwrap_or_default(),
        }
    }
}

/// Compact rendering: lines are wrapped in `[...]`, layers in `{...}`.
impl fmt::Display for ElementTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            f.write_str("[")?;
            for (i, element) in line.elements.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                match element {
                    Element::Token(t) => write!(f, "{t}")?,
                    Element::Layer(l) => write!(f, "{{{l}}}")?,
                }
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ElementTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementTree({self})")
    }
}

impl fmt::Debug for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.elements).finish()
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Token(t) => write!(f, "{t}"),
            Element::Layer(l) => write!(f, "{{{l}}}"),
        }
    }
}
