//! Parser for Latte.
//!
//! Turns the canonical element tree produced by `latte-scanner` into an
//! owned AST. Both surface syntaxes reach this crate as the same tree, so
//! nothing here depends on braces or indentation.
//!
//! # Example
//!
//! ```
//! use latte_core::ScannerMode;
//! use latte_parser::{TypeDecl, parse_source};
//!
//! let unit = parse_source("class A\n    def f(i:int):int = i + 1", ScannerMode::Indentation).unwrap();
//! assert!(matches!(unit.types[0], TypeDecl::Class(_)));
//! ```

pub mod ast;
mod cursor;
mod parser;

#[cfg(test)]
pub(crate) use parser::test_support;

use bumpalo::Bump;
use latte_core::{ScannerMode, SyntaxError};
use latte_scanner::{ElementTree, ModeSelection, scan_unit};

pub use ast::*;
pub use cursor::{ElementCursor, Group};
pub use parser::Parser;

/// Parse an already scanned tree.
pub fn parse(tree: &ElementTree<'_>) -> Result<CompilationUnit, Vec<SyntaxError>> {
    Parser::new().parse_unit(tree)
}

/// Scan and parse one source unit. A leading layout directive wins over
/// `default_mode`.
pub fn parse_source(source: &str, default_mode: ScannerMode) -> Result<CompilationUnit, Vec<SyntaxError>> {
    parse_source_unit(source, default_mode).map(|parsed| parsed.unit)
}

/// A parsed unit plus how its scanner mode was chosen.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub unit: CompilationUnit,
    pub selection: ModeSelection,
}

/// Like [`parse_source`], keeping the mode selection so callers can report
/// misplaced directives.
pub fn parse_source_unit(source: &str, default_mode: ScannerMode) -> Result<ParsedSource, Vec<SyntaxError>> {
    let arena = Bump::new();
    let scanned = scan_unit(source, default_mode, &arena).map_err(|error| vec![error])?;
    let unit = parse(&scanned.tree)?;
    Ok(ParsedSource {
        unit,
        selection: scanned.selection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_directives_travel_with_the_unit() {
        let parsed = parse_source_unit("class A
/// :scanner-brace
", ScannerMode::Indentation).unwrap();
        assert_eq!(parsed.selection.mode, ScannerMode::Indentation);
        assert_eq!(parsed.selection.ignored.len(), 1);
        assert_eq!(parsed.selection.ignored[0].line, 2);
        assert_eq!(parsed.unit.types.len(), 1);
    }
}
