//! Parse helpers for unit tests. Sources are scanned in indentation mode.

use bumpalo::Bump;
use latte_core::{ScannerMode, SyntaxError};
use latte_scanner::scan;

use super::Parser;
use crate::ast::{CompilationUnit, Expr, Stmt, TypeRef};
use crate::cursor::ElementCursor;

fn with_first_line<T>(source: &str, f: impl FnOnce(&mut Parser, &mut ElementCursor<'_, '_>) -> Result<T, SyntaxError>) -> T {
    let arena = Bump::new();
    let tree = scan(source, ScannerMode::Indentation, &arena).unwrap();
    let mut parser = Parser::new();
    let mut cursor = ElementCursor::of_line(&tree.lines()[0]);
    let value = f(&mut parser, &mut cursor).unwrap();
    assert!(parser.errors.is_empty(), "{:?}", parser.errors);
    value
}

pub fn parse_type(source: &str) -> TypeRef {
    with_first_line(source, |parser, cursor| {
        let ty = parser.type_ref(cursor)?;
        cursor.expect_end()?;
        Ok(ty)
    })
}

pub fn parse_expr(source: &str) -> Expr {
    with_first_line(source, |parser, cursor| parser.full_expr(cursor))
}

pub fn parse_stmts_err(source: &str) -> Vec<SyntaxError> {
    let arena = Bump::new();
    let tree = scan(source, ScannerMode::Indentation, &arena).unwrap();
    let mut parser = Parser::new();
    parser.block(&tree);
    parser.errors
}

pub fn parse_stmts(source: &str) -> Vec<Stmt> {
    let arena = Bump::new();
    let tree = scan(source, ScannerMode::Indentation, &arena).unwrap();
    let mut parser = Parser::new();
    let stmts = parser.block(&tree);
    assert!(parser.errors.is_empty(), "{:?}", parser.errors);
    stmts
}

pub fn parse_unit(source: &str) -> CompilationUnit {
    let arena = Bump::new();
    let tree = scan(source, ScannerMode::Indentation, &arena).unwrap();
    Parser::new().parse_unit(&tree).unwrap()
}

pub fn parse_unit_err(source: &str) -> Vec<SyntaxError> {
    let arena = Bump::new();
    let tree = scan(source, ScannerMode::Indentation, &arena).unwrap();
    Parser::new().parse_unit(&tree).unwrap_err()
}
