//! Element tree → AST.
//!
//! The parser walks the canonical element tree line by line. Each line is a
//! declaration or statement; a trailing layer is its body, and the layer
//! inside a bracket pair holds one entry per line. Errors are collected per
//! declaration or statement so one bad line does not hide the next.

mod decl;
mod expr;
mod stmt;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

use latte_core::{ParseErrorKind, SyntaxError};
use latte_scanner::{ElementTree, TokenKind};

use crate::ast::{CompilationUnit, Modifiers};
use crate::cursor::ElementCursor;

#[derive(Default)]
pub struct Parser {
    errors: Vec<SyntaxError>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whole unit, returning every error found.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse_unit(mut self, tree: &ElementTree<'_>) -> Result<CompilationUnit, Vec<SyntaxError>> {
        let unit = self.unit(tree);
        if self.errors.is_empty() {
            tracing::trace!(types = unit.types.len(), imports = unit.imports.len(), "parsed unit");
            Ok(unit)
        } else {
            Err(self.errors)
        }
    }

    fn report(&mut self, error: SyntaxError) {
        tracing::trace!(%error, "parse error");
        self.errors.push(error);
    }

    /// Leading modifier words, including the `static` keyword.
    fn modifiers(&mut self, cursor: &mut ElementCursor<'_, '_>) -> Result<Modifiers, SyntaxError> {
        let mut modifiers = Modifiers::empty();
        while let Some(token) = cursor.peek_token() {
            let is_modifier = token.kind == TokenKind::Modifier || token.is_keyword("static");
            if !is_modifier {
                break;
            }
            // `synchronized(...)` is a statement, not a modifier.
            if token.text == "synchronized" && cursor.peek_token_nth(1).is_some_and(|t| t.text == "(") {
                break;
            }
            let Some(flag) = Modifiers::from_keyword(token.text) else {
                return Err(cursor.error(ParseErrorKind::InvalidModifier, format!("unknown modifier '{}'", token.text)));
            };
            if modifiers.contains(flag) {
                return Err(cursor.error(ParseErrorKind::InvalidModifier, format!("duplicate modifier '{}'", token.text)));
            }
            modifiers |= flag;
            cursor.advance();
        }
        Ok(modifiers)
    }
}
