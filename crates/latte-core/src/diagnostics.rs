//! Structured compiler diagnostics.
//!
//! Every error produced by a phase is turned into a [`Diagnostic`] that
//! records the unit it belongs to, its position and a machine-readable
//! [`ErrorCode`]. A batch compile collects them in [`Diagnostics`] and keeps
//! going with sibling units after one of them fails.

use std::fmt;

use crate::{ErrorCode, LatteError, Span};

/// A single message from the compiler.
///
/// ```
/// use latte_core::{Diagnostic, DiagnosticKind, ErrorCode};
///
/// let d = Diagnostic {
///     kind: DiagnosticKind::Error,
///     code: ErrorCode::UnresolvedSymbol,
///     message: "cannot resolve symbol 'Foo'".into(),
///     unit: Some("main.lt".into()),
///     line: 4,
///     col: 9,
/// };
/// assert_eq!(d.to_string(), "main.lt:4:9: error[unresolved-symbol]: cannot resolve symbol 'Foo'");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub code: ErrorCode,
    pub message: String,
    /// Logical name of the source unit, if known.
    pub unit: Option<String>,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub col: u32,
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Compilation of the unit failed.
    Error,
    /// Suspicious but compilable; fatal only when the driver asks for it.
    Warning,
    Info,
}

impl Diagnostic {
    pub fn error(err: &LatteError, unit: Option<&str>) -> Self {
        let span = err.span();
        Self {
            kind: DiagnosticKind::Error,
            code: err.code(),
            message: err.to_string(),
            unit: unit.map(str::to_string),
            line: span.line,
            col: span.col,
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>, unit: Option<&str>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message: message.into(),
            unit: unit.map(str::to_string),
            line: span.line,
            col: span.col,
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Record an error raised while compiling `unit`.
    pub fn push_error(&mut self, err: impl Into<LatteError>, unit: &str) {
        let err = err.into();
        self.diagnostics.push(Diagnostic::error(&err, Some(unit)));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Warning)
    }

    /// Whether these diagnostics abort compilation under the given policy.
    pub fn is_fatal(&self, warnings_fatal: bool) -> bool {
        self.has_errors() || (warnings_fatal && self.has_warnings())
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Diagnostics carrying a given code, in order.
    pub fn with_code(&self, code: ErrorCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    /// Write every diagnostic on its own line.
    pub fn emit<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for diagnostic in &self.diagnostics {
            writeln!(writer, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Info => "info",
        };

        if let Some(unit) = &self.unit {
            write!(f, "{}:", unit)?;
        }
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.line,
            self.col,
            kind,
            self.code.as_str(),
            self.message
        )
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}
