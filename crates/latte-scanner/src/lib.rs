//! Layout scanner for Latte.
//!
//! Latte source comes in two interchangeable surface syntaxes: brace mode
//! (`{ }` blocks, newline or `;` separated statements) and indentation mode
//! (blocks introduced by deeper indentation). This crate normalizes both
//! into one canonical [`ElementTree`], so the parser never needs to know
//! which one it is looking at.
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use latte_core::ScannerMode;
//! use latte_scanner::scan;
//!
//! let arena = Bump::new();
//! let braces = scan("class A {\n  x = 1\n}", ScannerMode::Brace, &arena).unwrap();
//! let indent = scan("class A\n    x = 1", ScannerMode::Indentation, &arena).unwrap();
//! assert_eq!(braces, indent);
//! ```

mod builder;
mod cursor;
mod directive;
mod lexer;
mod normalize;
mod token;
mod tree;

use bumpalo::Bump;
use latte_core::{ScannerMode, SyntaxError};

pub use cursor::Indent;
pub use directive::{ModeSelection, select_mode};
pub use lexer::{Lexeme, Lexer};
pub use token::{Delimiter, KEYWORDS, MODIFIERS, Token, TokenKind};
pub use tree::{Element, ElementTree, Line};

/// Scan `source` in an explicit mode.
///
/// Token text is allocated in `arena`; the returned tree borrows from it.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn scan<'ast>(source: &str, mode: ScannerMode, arena: &'ast Bump) -> Result<ElementTree<'ast>, SyntaxError> {
    let mut lexer = Lexer::new(source, arena);
    let tree = match mode {
        ScannerMode::Brace => normalize::normalize_brace(&mut lexer)?,
        ScannerMode::Indentation => normalize::normalize_indent(&mut lexer)?,
    };
    tracing::trace!(%mode, lines = tree.len(), tokens = tree.token_count(), "scanned source");
    Ok(tree)
}

/// A scanned unit together with the mode it was scanned in.
#[derive(Debug)]
pub struct ScannedUnit<'ast> {
    pub tree: ElementTree<'ast>,
    pub selection: ModeSelection,
}

/// Scan a whole unit: honour its leading directive, otherwise use
/// `default_mode`.
pub fn scan_unit<'ast>(
    source: &str,
    default_mode: ScannerMode,
    arena: &'ast Bump,
) -> Result<ScannedUnit<'ast>, SyntaxError> {
    let selection = select_mode(source, default_mode)?;
    let tree = scan(source, selection.mode, arena)?;
    Ok(ScannedUnit { tree, selection })
}

#[cfg(test)]
mod tests {
    use super::*;
    use latte_core::Span;

    fn scan_both(brace: &str, indent: &str) -> (String, String) {
        let arena = Bump::new();
        let a = scan_unit(brace, ScannerMode::Indentation, &arena).unwrap();
        let b = scan_unit(indent, ScannerMode::Indentation, &arena).unwrap();
        assert_eq!(a.tree, b.tree, "\nbrace:  {}\nindent: {}", a.tree, b.tree);
        assert!(a.tree.equals_ignore_layout(&b.tree));
        (a.tree.to_string(), b.tree.to_string())
    }

    fn render(source: &str, mode: ScannerMode) -> String {
        let arena = Bump::new();
        scan(source, mode, &arena).unwrap().to_string()
    }

    fn scan_err(source: &str, mode: ScannerMode) -> SyntaxError {
        let arena = Bump::new();
        scan(source, mode, &arena).unwrap_err()
    }

    // =========================================
    // Parity between the two syntaxes
    // =========================================

    #[test]
    fn class_header_parity() {
        let (brace, _) = scan_both(
            "/// :scanner-brace\nclass A(a, public b):B(a) {\nprotected x=1\n}",
            "class A(a, public b):B(a)\n    protected x=1",
        );
        assert_eq!(brace, "[class A ( {[a][public b]} ) : B ( {[a]} ) {[protected x = 1]}]");
    }

    #[test]
    fn map_literal_layout_parity() {
        let (brace, _) = scan_both(
            "/// :scanner-brace\n[\"a\":1\n\"b\":2,\"c\":3\n\"d\":4]",
            "[\n    \"a\":1\n    \"b\":2,\n    \"c\":3\n    \"d\":4\n]",
        );
        assert_eq!(brace, r#"[[ {["a" : 1]["b" : 2]["c" : 3]["d" : 4]} ]]"#);
    }

    #[test]
    fn nested_blocks_parity() {
        scan_both(
            "/// :scanner-brace\nclass A {\n  def f(x) {\n    if x > 1 {\n      return 1\n    } elseif x < 0 {\n      return 2\n    } else {\n      return 3\n    }\n  }\n  def g = 1\n}",
            "class A\n  def f(x)\n    if x > 1\n      return 1\n    elseif x < 0\n      return 2\n    else\n      return 3\n  def g = 1",
        );
    }

    #[test]
    fn synchronized_parity() {
        scan_both(
            "/// :scanner-brace\nsynchronized(a, b) { c.i = 1; a.i += 1 }\nreturn 10",
            "synchronized(a, b)\n    c.i = 1\n    a.i += 1\nreturn 10",
        );
    }

    #[test]
    fn allman_braces_attach_to_header() {
        scan_both(
            "/// :scanner-brace\nclass A\n{\n  x = 1\n}",
            "class A\n    x = 1",
        );
    }

    #[test]
    fn lambda_with_block_body_parity() {
        scan_both(
            "/// :scanner-brace\nf = (x) -> {\n  return x\n}",
            "f = (x) ->\n    return x",
        );
    }

    // =========================================
    // Shape details
    // =========================================

    #[test]
    fn empty_pairs_have_no_layer() {
        assert_eq!(render("f = ()->1", ScannerMode::Indentation), "[f = ( ) -> 1]");
    }

    #[test]
    fn semicolons_split_lines() {
        assert_eq!(render("a = 1; b = 2", ScannerMode::Brace), "[a = 1][b = 2]");
        assert_eq!(render("a = 1; b = 2", ScannerMode::Indentation), "[a = 1][b = 2]");
    }

    #[test]
    fn commas_outside_pairs_stay_tokens() {
        assert_eq!(render("class A : B, C", ScannerMode::Brace), "[class A : B , C]");
    }

    #[test]
    fn blank_and_comment_lines_do_not_affect_indentation() {
        assert_eq!(
            render("class A\n\n    // comment\n    x = 1\n\ny = 2", ScannerMode::Indentation),
            "[class A {[x = 1]}][y = 2]"
        );
    }

    #[test]
    fn only_relative_indentation_matters() {
        assert_eq!(
            render("a\n  b\n        c\n  d", ScannerMode::Indentation),
            render("a\n    b\n      c\n    d", ScannerMode::Indentation)
        );
    }

    #[test]
    fn indentation_inside_pairs_is_ignored() {
        assert_eq!(
            render("f(a,\n        b)\ng", ScannerMode::Indentation),
            "[f ( {[a][b]} )][g]"
        );
    }

    // =========================================
    // Errors
    // =========================================

    #[test]
    fn mixed_tabs_and_spaces_rejected() {
        let err = scan_err("class A\n\t x = 1", ScannerMode::Indentation);
        assert!(matches!(err, SyntaxError::MixedIndentation { span } if span.line == 2));

        let err = scan_err("class A\n\tx = 1\nclass B\n    y = 2", ScannerMode::Indentation);
        assert!(matches!(err, SyntaxError::MixedIndentation { span } if span.line == 4));
    }

    #[test]
    fn mixed_indentation_is_fine_in_brace_mode() {
        let arena = Bump::new();
        assert!(scan("class A {\n\t x = 1\n}", ScannerMode::Brace, &arena).is_ok());
    }

    #[test]
    fn inconsistent_dedent_rejected() {
        let err = scan_err("a\n    b\n  c", ScannerMode::Indentation);
        assert_eq!(err, SyntaxError::InconsistentDedent { span: Span::new(3, 1, 2) });
    }

    #[test]
    fn unclosed_and_mismatched_delimiters() {
        assert!(matches!(
            scan_err("class A {\n x = 1", ScannerMode::Brace),
            SyntaxError::UnclosedDelimiter { open: '{', .. }
        ));
        assert!(matches!(
            scan_err("m = [\"a\":1", ScannerMode::Indentation),
            SyntaxError::UnclosedDelimiter { open: '[', .. }
        ));
        assert!(matches!(
            scan_err("f(a]", ScannerMode::Brace),
            SyntaxError::MismatchedDelimiter { expected: ')', found: ']', .. }
        ));
        assert!(matches!(
            scan_err("x }", ScannerMode::Brace),
            SyntaxError::UnexpectedClose { found: '}', .. }
        ));
    }

    #[test]
    fn unterminated_string_rejected() {
        assert!(matches!(
            scan_err("s = \"abc", ScannerMode::Indentation),
            SyntaxError::UnterminatedString { .. }
        ));
    }
}
