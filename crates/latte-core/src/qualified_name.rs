//! Package-qualified class and member names.
//!
//! Latte source may spell the same path three ways: dotted (`a.b.C`),
//! hierarchical (`a::b::C`) or in class-file form (`a/b/C`). All three
//! produce the same [`QualifiedName`], so resolution never has to care
//! which one the author picked.

use std::fmt;

use crate::ClassHash;

/// Separators accepted between package segments.
pub const PATH_SEPARATORS: [&str; 3] = ["::", ".", "/"];

/// Whether a name contains an embedded path separator.
///
/// Such names bypass import lookup and are resolved as fully qualified paths.
pub fn has_path_separator(name: &str) -> bool {
    PATH_SEPARATORS.iter().any(|sep| name.contains(sep))
}

/// Split a path written with any mix of separators into its segments.
///
/// Empty segments (leading `::`, doubled dots) are dropped.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split("::")
        .flat_map(|part| part.split(['.', '/']))
        .filter(|s| !s.is_empty())
        .collect()
}

/// A class name together with the package it lives in.
///
/// # Examples
///
/// ```
/// use latte_core::QualifiedName;
///
/// let dotted = QualifiedName::parse("x.y.z.X");
/// let scoped = QualifiedName::parse("x::y::z::X");
/// assert_eq!(dotted, scoped);
/// assert_eq!(dotted.internal_name(), "x/y/z/X");
/// assert_eq!(dotted.to_string(), "x.y.z.X");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Package segments, empty for the default package.
    pub package: Vec<String>,
    /// Simple name.
    pub name: String,
}

impl QualifiedName {
    pub fn new(package: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            package,
            name: name.into(),
        }
    }

    /// A name in the default (unnamed) package.
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            package: Vec::new(),
            name: name.into(),
        }
    }

    /// Parse a path written with `.`, `::` or `/` separators.
    pub fn parse(path: &str) -> Self {
        Self::from_segments(&split_path(path))
    }

    /// Build from pre-split segments; the last one is the simple name.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        match segments.split_last() {
            Some((last, package)) => Self {
                package: package.iter().map(|s| s.as_ref().to_string()).collect(),
                name: last.as_ref().to_string(),
            },
            None => Self::simple(""),
        }
    }

    /// Name as it appears in class files (`java/lang/Object`).
    pub fn internal_name(&self) -> String {
        self.join("/")
    }

    /// Dotted form (`java.lang.Object`), also used for output map keys.
    pub fn dotted(&self) -> String {
        self.join(".")
    }

    pub fn is_default_package(&self) -> bool {
        self.package.is_empty()
    }

    pub fn simple_name(&self) -> &str {
        &self.name
    }

    /// Package in dotted form, empty for the default package.
    pub fn package_string(&self) -> String {
        self.package.join(".")
    }

    /// All segments, package first.
    pub fn segments(&self) -> Vec<&str> {
        self.package
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
            .collect()
    }

    /// A sibling class in the same package.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self {
            package: self.package.clone(),
            name: name.into(),
        }
    }

    pub fn class_hash(&self) -> ClassHash {
        ClassHash::of(self)
    }

    fn join(&self, sep: &str) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}{}{}", self.package.join(sep), sep, self.name)
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_separators_denote_the_same_name() {
        let a = QualifiedName::parse("x.y.z.a.b.c.X");
        let b = QualifiedName::parse("x::y::z::a::b::c::X");
        let c = QualifiedName::parse("x/y/z/a/b/c/X");
        let mixed = QualifiedName::parse("x::y.z/a::b.c::X");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, mixed);
        assert_eq!(a.class_hash(), b.class_hash());
    }

    #[test]
    fn leading_separator_is_ignored() {
        assert_eq!(QualifiedName::parse("::lt::lang::Unit"), QualifiedName::parse("lt.lang.Unit"));
    }

    #[test]
    fn default_package() {
        let name = QualifiedName::parse("Main");
        assert!(name.is_default_package());
        assert_eq!(name.internal_name(), "Main");
        assert_eq!(name.package_string(), "");
    }

    #[test]
    fn forms() {
        let name = QualifiedName::parse("java::lang::Thread");
        assert_eq!(name.internal_name(), "java/lang/Thread");
        assert_eq!(name.dotted(), "java.lang.Thread");
        assert_eq!(name.segments(), vec!["java", "lang", "Thread"]);
        assert_eq!(name.sibling("Runnable").dotted(), "java.lang.Runnable");
    }

    #[test]
    fn separator_detection() {
        assert!(has_path_separator("a::B"));
        assert!(has_path_separator("a.B"));
        assert!(!has_path_separator("B"));
    }
}
