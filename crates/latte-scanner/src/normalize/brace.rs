use latte_core::SyntaxError;

use crate::builder::TreeBuilder;
use crate::lexer::{Lexeme, Lexer};
use crate::tree::ElementTree;

/// Brace mode: every new physical line ends the line in progress and
/// indentation carries no meaning.
pub fn normalize_brace<'ast>(lexer: &mut Lexer<'_, 'ast>) -> Result<ElementTree<'ast>, SyntaxError> {
    let mut builder = TreeBuilder::new();
    while let Some(lexeme) = lexer.next_lexeme()? {
        match lexeme {
            Lexeme::LineStart { .. } => builder.end_line(),
            Lexeme::Token(token) => builder.token(token)?,
        }
    }
    builder.finish()
}
