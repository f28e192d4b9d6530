//! Unified error types for the Latte compiler.
//!
//! ## Error Hierarchy
//!
//! ```text
//! LatteError (top-level wrapper)
//! ├── SyntaxError   - layout scanning and parsing
//! ├── ResolveError  - unresolved or ambiguous names
//! └── CodeGenError  - impossible conversions, malformed lambda targets
//! ```
//!
//! Every error carries the [`Span`] it was raised at, and maps to a
//! machine-distinguishable [`ErrorCode`] for diagnostics.

use thiserror::Error;

use crate::Span;

/// Machine-readable category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Syntax,
    UnresolvedSymbol,
    AmbiguousSymbol,
    CodeGen,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Syntax => "syntax",
            ErrorCode::UnresolvedSymbol => "unresolved-symbol",
            ErrorCode::AmbiguousSymbol => "ambiguous-symbol",
            ErrorCode::CodeGen => "codegen",
        }
    }
}

// ============================================================================
// Syntax Errors
// ============================================================================

/// Categories of parse errors raised after the layout scanner succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    ExpectedToken,
    UnexpectedToken,
    UnexpectedEnd,
    ExpectedExpression,
    ExpectedIdentifier,
    ExpectedType,
    ExpectedBlock,
    InvalidDeclaration,
    InvalidStatement,
    InvalidLiteral,
    InvalidModifier,
    /// `elseif`/`else` without a preceding `if`.
    DanglingElse,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEnd => "unexpected end of line",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::ExpectedBlock => "expected block",
            ParseErrorKind::InvalidDeclaration => "invalid declaration",
            ParseErrorKind::InvalidStatement => "invalid statement",
            ParseErrorKind::InvalidLiteral => "invalid literal",
            ParseErrorKind::InvalidModifier => "invalid modifier",
            ParseErrorKind::DanglingElse => "else without if",
        }
    }
}

/// Malformed layout, tokens or grammar. Fatal for the unit it occurs in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated string at {span}")]
    UnterminatedString { span: Span },

    #[error("unterminated comment at {span}")]
    UnterminatedComment { span: Span },

    #[error("invalid number at {span}: {detail}")]
    InvalidNumber { span: Span, detail: String },

    #[error("'{open}' opened at {span} is never closed")]
    UnclosedDelimiter { open: char, span: Span },

    #[error("expected '{expected}' but found '{found}' at {span}")]
    MismatchedDelimiter {
        expected: char,
        found: char,
        span: Span,
    },

    #[error("unexpected '{found}' at {span}")]
    UnexpectedClose { found: char, span: Span },

    #[error("indentation at {span} does not match any enclosing block")]
    InconsistentDedent { span: Span },

    #[error("mixed tabs and spaces in indentation at {span}")]
    MixedIndentation { span: Span },

    #[error("unknown scanner directive '{directive}' at {span}")]
    UnknownDirective { directive: String, span: Span },

    #[error("{}: {message} at {span}", kind.as_str())]
    Parse {
        kind: ParseErrorKind,
        message: String,
        span: Span,
    },
}

impl SyntaxError {
    pub fn parse(kind: ParseErrorKind, message: impl Into<String>, span: Span) -> Self {
        SyntaxError::Parse {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            SyntaxError::UnexpectedChar { span, .. }
            | SyntaxError::UnterminatedString { span }
            | SyntaxError::UnterminatedComment { span }
            | SyntaxError::InvalidNumber { span, .. }
            | SyntaxError::UnclosedDelimiter { span, .. }
            | SyntaxError::MismatchedDelimiter { span, .. }
            | SyntaxError::UnexpectedClose { span, .. }
            | SyntaxError::InconsistentDedent { span }
            | SyntaxError::MixedIndentation { span }
            | SyntaxError::UnknownDirective { span, .. }
            | SyntaxError::Parse { span, .. } => *span,
        }
    }
}

// ============================================================================
// Resolution Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("cannot resolve symbol '{name}' at {span}")]
    Unresolved { name: String, span: Span },

    #[error("'{name}' is ambiguous at {span}: candidates are {}", candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
        span: Span,
    },

    #[error("class '{name}' is defined more than once (second definition at {span})")]
    DuplicateClass { name: String, span: Span },
}

impl ResolveError {
    pub fn unresolved(name: impl Into<String>, span: Span) -> Self {
        ResolveError::Unresolved {
            name: name.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ResolveError::Unresolved { span, .. }
            | ResolveError::Ambiguous { span, .. }
            | ResolveError::DuplicateClass { span, .. } => *span,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ResolveError::Ambiguous { .. } => ErrorCode::AmbiguousSymbol,
            ResolveError::Unresolved { .. } | ResolveError::DuplicateClass { .. } => {
                ErrorCode::UnresolvedSymbol
            }
        }
    }
}

// ============================================================================
// Code Generation Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodeGenError {
    #[error("cannot convert {from} to {to} at {span}")]
    ImpossibleConversion { from: String, to: String, span: Span },

    #[error("'{target}' cannot be implemented by a lambda: {reason} (at {span})")]
    InvalidLambdaTarget {
        target: String,
        reason: String,
        span: Span,
    },

    #[error("lambda takes {found} parameter(s) but its target expects {expected} at {span}")]
    LambdaArity {
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("no applicable method '{name}' on {owner} at {span}")]
    NoApplicableMethod {
        owner: String,
        name: String,
        span: Span,
    },

    #[error("no static member '{name}' on {owner} at {span}")]
    UnknownMember {
        owner: String,
        name: String,
        span: Span,
    },

    #[error("cannot assign to captured variable '{name}' at {span}")]
    CapturedAssignment { name: String, span: Span },

    #[error("invalid assignment target at {span}")]
    InvalidAssignment { span: Span },

    #[error("cannot lock on a value of type {ty} at {span}")]
    LockOnPrimitive { ty: String, span: Span },

    #[error("expression of type Unit used as a value at {span}")]
    VoidValue { span: Span },

    #[error("'{keyword}' outside of a loop at {span}")]
    NotInLoop { keyword: &'static str, span: Span },

    #[error("method '{method}' exceeds the maximum branch distance")]
    CodeTooLarge { method: String },

    #[error("class '{class}' has a string constant of {len} bytes, the limit is 65535")]
    ConstantTooLong { class: String, len: usize },

    #[error("{what} is not supported at {span}")]
    Unsupported { what: String, span: Span },
}

impl CodeGenError {
    pub fn conversion(from: impl ToString, to: impl ToString, span: Span) -> Self {
        CodeGenError::ImpossibleConversion {
            from: from.to_string(),
            to: to.to_string(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CodeGenError::ImpossibleConversion { span, .. }
            | CodeGenError::InvalidLambdaTarget { span, .. }
            | CodeGenError::LambdaArity { span, .. }
            | CodeGenError::NoApplicableMethod { span, .. }
            | CodeGenError::UnknownMember { span, .. }
            | CodeGenError::CapturedAssignment { span, .. }
            | CodeGenError::InvalidAssignment { span }
            | CodeGenError::LockOnPrimitive { span, .. }
            | CodeGenError::VoidValue { span }
            | CodeGenError::NotInLoop { span, .. }
            | CodeGenError::Unsupported { span, .. } => *span,
            CodeGenError::CodeTooLarge { .. } | CodeGenError::ConstantTooLong { .. } => Span::default(),
        }
    }
}

// ============================================================================
// Unified Error
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatteError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    CodeGen(#[from] CodeGenError),
}

impl LatteError {
    pub fn span(&self) -> Span {
        match self {
            LatteError::Syntax(e) => e.span(),
            LatteError::Resolve(e) => e.span(),
            LatteError::CodeGen(e) => e.span(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LatteError::Syntax(_) => ErrorCode::Syntax,
            LatteError::Resolve(e) => e.code(),
            LatteError::CodeGen(_) => ErrorCode::CodeGen,
        }
    }
}
