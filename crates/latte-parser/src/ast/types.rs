//! Names, type references and modifiers.

use std::fmt;

use bitflags::bitflags;
use latte_core::{PrimitiveKind, QualifiedName, Span};

/// A possibly qualified name as written: `a::b::C`, `a.b.C` or `C`.
///
/// The separator used in source is not recorded; both spellings produce the
/// same segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    pub segments: Vec<String>,
    pub span: Span,
}

impl Path {
    pub fn new(segments: Vec<String>, span: Span) -> Self {
        Self { segments, span }
    }

    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        Self {
            segments: vec![name.into()],
            span,
        }
    }

    /// True for a single-segment path.
    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1
    }

    /// Last segment.
    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn to_qualified(&self) -> QualifiedName {
        QualifiedName::from_segments(&self.segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// A type as written in a declaration or cast.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// `Unit`
    Unit(Span),
    Primitive(PrimitiveKind, Span),
    Named(Path),
    /// `[]T`
    Array(Box<TypeRef>, Span),
}

impl TypeRef {
    pub fn span(&self) -> Span {
        match self {
            TypeRef::Unit(span) | TypeRef::Primitive(_, span) | TypeRef::Array(_, span) => *span,
            TypeRef::Named(path) => path.span,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, TypeRef::Unit(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Unit(_) => f.write_str("Unit"),
            TypeRef::Primitive(kind, _) => f.write_str(kind.name()),
            TypeRef::Named(path) => write!(f, "{path}"),
            TypeRef::Array(inner, _) => write!(f, "[]{inner}"),
        }
    }
}

bitflags! {
    /// Declaration modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const INTERNAL = 1 << 3;
        const STATIC = 1 << 4;
        const ABSTRACT = 1 << 5;
        const FINAL = 1 << 6;
        const VAL = 1 << 7;
        const VAR = 1 << 8;
        const DEF = 1 << 9;
        const SYNCHRONIZED = 1 << 10;
        const VOLATILE = 1 << 11;
        const TRANSIENT = 1 << 12;
        const NATIVE = 1 << 13;
        const STRICTFP = 1 << 14;
        const DATA = 1 << 15;
        const NONNULL = 1 << 16;
        const NONEMPTY = 1 << 17;
        const IMPLICIT = 1 << 18;
    }
}

impl Modifiers {
    /// Flag for a modifier keyword.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "public" => Self::PUBLIC,
            "protected" => Self::PROTECTED,
            "private" => Self::PRIVATE,
            "internal" => Self::INTERNAL,
            "static" => Self::STATIC,
            "abstract" => Self::ABSTRACT,
            "final" => Self::FINAL,
            "val" => Self::VAL,
            "var" => Self::VAR,
            "def" => Self::DEF,
            "synchronized" => Self::SYNCHRONIZED,
            "volatile" => Self::VOLATILE,
            "transient" => Self::TRANSIENT,
            "native" => Self::NATIVE,
            "strictfp" => Self::STRICTFP,
            "data" => Self::DATA,
            "nonnull" => Self::NONNULL,
            "nonempty" => Self::NONEMPTY,
            "implicit" => Self::IMPLICIT,
            _ => return None,
        })
    }

    pub const ACCESS: Self = Self::PUBLIC.union(Self::PROTECTED).union(Self::PRIVATE).union(Self::INTERNAL);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_to_qualified() {
        let path = Path::new(vec!["java".into(), "util".into(), "List".into()], Span::default());
        assert_eq!(path.to_qualified().internal_name(), "java/util/List");
        assert_eq!(path.last(), "List");
        assert!(!path.is_simple());
    }

    #[test]
    fn modifier_keywords() {
        assert_eq!(Modifiers::from_keyword("val"), Some(Modifiers::VAL));
        assert_eq!(Modifiers::from_keyword("class"), None);
        assert!(Modifiers::ACCESS.contains(Modifiers::PRIVATE));
    }
}
