//! Paths, type references and parameter lists.

use latte_core::{ParseErrorKind, PrimitiveKind, SyntaxError};
use latte_scanner::{Delimiter, TokenKind};

use super::Parser;
use crate::ast::{Param, Path, TypeRef};
use crate::cursor::{ElementCursor, Group};

impl Parser {
    /// `a::b::C` or `a.b.C`. The two separators are interchangeable.
    pub(super) fn path(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Path, SyntaxError> {
        let first = cursor.expect_name()?;
        let mut span = first.span;
        let mut segments = vec![first.text.to_string()];
        while (cursor.check_symbol("::") || cursor.check_symbol("."))
            && cursor.peek_token_nth(1).is_some_and(|t| t.kind == TokenKind::Name)
        {
            cursor.advance();
            let segment = cursor.expect_name()?;
            span = span.to(segment.span);
            segments.push(segment.text.to_string());
        }
        Ok(Path::new(segments, span))
    }

    pub(super) fn type_ref(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<TypeRef, SyntaxError> {
        let start = cursor.span();
        if let Some(group) = cursor.eat_group(Delimiter::Bracket)? {
            if !group.is_empty() {
                return Err(SyntaxError::parse(ParseErrorKind::ExpectedType, "expected '[]'", group.span));
            }
            let component = self.type_ref(cursor)?;
            let span = start.to(component.span());
            return Ok(TypeRef::Array(Box::new(component), span));
        }

        if !cursor.check_kind(TokenKind::Name) {
            return Err(cursor.error(ParseErrorKind::ExpectedType, "expected a type"));
        }
        let path = self.path(cursor)?;
        if path.is_simple() {
            if path.last() == "Unit" {
                return Ok(TypeRef::Unit(path.span));
            }
            if let Some(kind) = PrimitiveKind::from_name(path.last()) {
                return Ok(TypeRef::Primitive(kind, path.span));
            }
        }
        Ok(TypeRef::Named(path))
    }

    /// `[modifiers] name [: Type]`
    pub(super) fn param(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Param, SyntaxError> {
        let start = cursor.span();
        let modifiers = self.modifiers(cursor)?;
        let name = cursor.expect_name()?;
        let ty = if cursor.eat_symbol(":") {
            Some(self.type_ref(cursor)?)
        } else {
            None
        };
        cursor.expect_end()?;
        Ok(Param {
            modifiers,
            name: name.text.to_string(),
            ty,
            span: start.to(cursor.last_span()),
        })
    }

    /// One parameter per line of the group.
    pub(super) fn params(&mut self, group: &Group<'_, '_>) -> Result<Vec<Param>, SyntaxError> {
        group
            .lines()
            .iter()
            .map(|line| self.param(&mut ElementCursor::of_line(line)))
            .collect()
    }
}
