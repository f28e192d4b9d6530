//! Scanner-mode directives.
//!
//! A unit may select its surface syntax with a comment on its first
//! non-blank line:
//!
//! ```text
//! /// :scanner-brace
//! ```
//!
//! Anywhere else the same comment has no effect; it is reported so the
//! driver can warn about it.

use latte_core::{ScannerMode, Span, SyntaxError};

const DIRECTIVE_PREFIX: &str = ":scanner-";

/// The mode chosen for one unit and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSelection {
    pub mode: ScannerMode,
    /// Span of the directive that selected the mode, if any.
    pub directive: Option<Span>,
    /// Directives found after the first meaningful line.
    pub ignored: Vec<Span>,
}

/// Pick the scanner mode for a unit from its leading directive, falling back
/// to `default`.
pub fn select_mode(source: &str, default: ScannerMode) -> Result<ModeSelection, SyntaxError> {
    let mut selection = ModeSelection {
        mode: default,
        directive: None,
        ignored: Vec::new(),
    };
    let mut seen_content = false;

    for (index, raw) in source.lines().enumerate() {
        let line_no = index as u32 + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let directive = parse_directive(trimmed);

        if !seen_content {
            seen_content = true;
            if let Some(name) = directive {
                let col = (raw.len() - raw.trim_start().len()) as u32 + 1;
                let span = Span::new(line_no, col, trimmed.len() as u32);
                selection.mode = ScannerMode::from_directive(name).ok_or_else(|| SyntaxError::UnknownDirective {
                    directive: format!("{DIRECTIVE_PREFIX}{name}"),
                    span,
                })?;
                selection.directive = Some(span);
            }
            continue;
        }

        if directive.is_some() {
            selection.ignored.push(Span::new(line_no, 1, trimmed.len() as u32));
        }
    }

    Ok(selection)
}

/// `/// :scanner-brace` → `Some("brace")`
fn parse_directive(line: &str) -> Option<&str> {
    let body = line.strip_prefix("///")?.trim();
    body.strip_prefix(DIRECTIVE_PREFIX).map(str::trim)
}
