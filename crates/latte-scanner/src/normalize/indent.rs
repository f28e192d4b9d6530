use latte_core::{Span, SyntaxError};

use crate::builder::TreeBuilder;
use crate::cursor::Indent;
use crate::lexer::{Lexeme, Lexer};
use crate::tree::ElementTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentChar {
    Space,
    Tab,
}

/// Stack of open indentation levels plus the file's indentation character.
#[derive(Default)]
struct Levels {
    widths: Vec<u32>,
    style: Option<IndentChar>,
}

impl Levels {
    /// Reject a line whose indentation mixes tabs and spaces, or uses a
    /// different character than earlier lines.
    fn check_style(&mut self, indent: Indent, span: Span) -> Result<(), SyntaxError> {
        if indent.has_tabs && indent.has_spaces {
            return Err(SyntaxError::MixedIndentation { span });
        }
        let current = if indent.has_tabs {
            IndentChar::Tab
        } else if indent.has_spaces {
            IndentChar::Space
        } else {
            return Ok(());
        };
        match self.style {
            None => self.style = Some(current),
            Some(style) if style != current => return Err(SyntaxError::MixedIndentation { span }),
            Some(_) => {}
        }
        Ok(())
    }
}

/// Indentation mode: a deeper line opens a block attached to the line above,
/// a shallower one closes blocks until the level matches an enclosing one.
///
/// Only relative depth matters. Inside `( )`, `[ ]` and `{ }` indentation is
/// ignored and line starts behave as in brace mode.
pub fn normalize_indent<'ast>(lexer: &mut Lexer<'_, 'ast>) -> Result<ElementTree<'ast>, SyntaxError> {
    let mut builder = TreeBuilder::new();
    let mut levels = Levels::default();

    while let Some(lexeme) = lexer.next_lexeme()? {
        let (indent, span) = match lexeme {
            Lexeme::Token(token) => {
                builder.token(token)?;
                continue;
            }
            Lexeme::LineStart { indent, span } => (indent, span),
        };

        if !builder.at_layout_level() {
            builder.end_line();
            continue;
        }

        levels.check_style(indent, span)?;
        let width = indent.width;
        let Some(&top) = levels.widths.last() else {
            levels.widths.push(width);
            continue;
        };

        if width > top {
            builder.open_indent_block();
            levels.widths.push(width);
            continue;
        }

        builder.end_line();
        while let Some(&top) = levels.widths.last()
            && width < top
        {
            if levels.widths.len() == 1 {
                return Err(SyntaxError::InconsistentDedent { span });
            }
            levels.widths.pop();
            builder.close_indent_block(span)?;
        }
        if levels.widths.last() != Some(&width) {
            return Err(SyntaxError::InconsistentDedent { span });
        }
    }

    builder.finish()
}
