//! Import tables.
//!
//! An [`ImportTable`] holds the imports of one unit in source order. Each
//! entry is classified against the class registry when the table is built:
//!
//! | Written           | Registry says              | Entry                    |
//! |-------------------|----------------------------|--------------------------|
//! | `a::b::C`         | `a.b.C` is a class         | exact type               |
//! | `a::b::C::m`      | `a.b.C` is a class         | exact static member      |
//! | `a::b::C::_`      | `a.b.C` is a class         | wildcard static members  |
//! | `a::b::_`         | package `a.b` exists       | wildcard package         |
//!
//! Anything else is unresolved. Whether an exact static member actually
//! exists is checked by [`ImportTable::validate_members`] once every class
//! header of the batch is registered.
//!
//! Lookups are positional: an import is visible only from the point where
//! it is written onward.

use latte_core::{QualifiedName, ResolveError, Span};
use latte_parser::ImportDecl;
use latte_registry::ClassRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Exact,
    WildcardPackage,
    WildcardStaticMember,
}

/// What an import brings into scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    Type(QualifiedName),
    StaticMember { owner: QualifiedName, member: String },
    /// Every static member of a type.
    StaticMembers(QualifiedName),
    Package(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub kind: ImportKind,
    pub target: ImportTarget,
    pub span: Span,
}

impl Import {
    pub fn line(&self) -> u32 {
        self.span.line
    }

    /// Whether a use at `at` can see this import.
    pub fn visible_at(&self, at: Span) -> bool {
        (self.span.line, self.span.col) < (at.line, at.col)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    entries: Vec<Import>,
    /// Packages imported without being written, consulted after every
    /// explicit import.
    implicit: Vec<Vec<String>>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the imports of a unit. Every unresolvable import is
    /// reported.
    pub fn build(
        imports: &[ImportDecl],
        implicit: &[String],
        registry: &ClassRegistry,
    ) -> Result<Self, Vec<ResolveError>> {
        let mut table = Self::new();
        let mut errors = Vec::new();

        for decl in imports {
            match classify(decl, registry) {
                Ok(import) => table.entries.push(import),
                Err(error) => errors.push(error),
            }
        }
        for package in implicit {
            table.add_implicit(latte_core::split_path(package).into_iter().map(str::to_string).collect());
        }

        if errors.is_empty() {
            Ok(table)
        } else {
            Err(errors)
        }
    }

    pub fn push(&mut self, import: Import) {
        self.entries.push(import);
    }

    pub fn add_implicit(&mut self, package: Vec<String>) {
        if !self.implicit.contains(&package) {
            self.implicit.push(package);
        }
    }

    pub fn entries(&self) -> &[Import] {
        &self.entries
    }

    pub fn implicit(&self) -> &[Vec<String>] {
        &self.implicit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Imports of `kind` visible at `at`, in source order.
    pub fn visible(&self, kind: ImportKind, at: Span) -> impl Iterator<Item = &Import> {
        self.entries
            .iter()
            .filter(move |import| import.kind == kind && import.visible_at(at))
    }

    /// Check that every exact static-member import names a static field or
    /// method of its owner.
    pub fn validate_members(&self, registry: &ClassRegistry) -> Result<(), Vec<ResolveError>> {
        let errors: Vec<ResolveError> = self
            .entries
            .iter()
            .filter_map(|import| match &import.target {
                ImportTarget::StaticMember { owner, member } if !has_static_member(registry, owner, member) => {
                    Some(ResolveError::unresolved(format!("{}.{member}", owner.dotted()), import.span))
                }
                _ => None,
            })
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn classify(decl: &ImportDecl, registry: &ClassRegistry) -> Result<Import, ResolveError> {
    let segments = &decl.path.segments;
    let unresolved = || ResolveError::unresolved(decl.path.to_string(), decl.span);

    if decl.wildcard {
        let whole = QualifiedName::from_segments(segments);
        if registry.contains(&whole) {
            return Ok(Import {
                kind: ImportKind::WildcardStaticMember,
                target: ImportTarget::StaticMembers(whole),
                span: decl.span,
            });
        }
        if registry.has_package(segments) {
            return Ok(Import {
                kind: ImportKind::WildcardPackage,
                target: ImportTarget::Package(segments.clone()),
                span: decl.span,
            });
        }
        return Err(unresolved());
    }

    let whole = QualifiedName::from_segments(segments);
    if registry.contains(&whole) {
        return Ok(Import {
            kind: ImportKind::Exact,
            target: ImportTarget::Type(whole),
            span: decl.span,
        });
    }
    if let Some((member, owner)) = segments.split_last()
        && !owner.is_empty()
    {
        let owner = QualifiedName::from_segments(owner);
        if registry.contains(&owner) {
            return Ok(Import {
                kind: ImportKind::Exact,
                target: ImportTarget::StaticMember {
                    owner,
                    member: member.clone(),
                },
                span: decl.span,
            });
        }
    }
    Err(unresolved())
}

/// Whether `owner` or one of its supertypes declares a static field or
/// method called `member`.
pub(crate) fn has_static_member(registry: &ClassRegistry, owner: &QualifiedName, member: &str) -> bool {
    registry.find_field(owner, member).is_some_and(|(_, f)| f.is_static())
        || registry.find_methods(owner, member).iter().any(|(_, m)| m.is_static())
}

#[cfg(test)]
mod tests {
    use super::*;
    use latte_parser::Path;

    fn import(path: &str, wildcard: bool, line: u32) -> ImportDecl {
        ImportDecl {
            path: Path::new(path.split('.').map(str::to_string).collect(), Span::new(line, 8, 1)),
            wildcard,
            span: Span::new(line, 1, 1),
        }
    }

    #[test]
    fn classifies_each_form() {
        let registry = ClassRegistry::with_builtins();
        let table = ImportTable::build(
            &[
                import("java.util.List", false, 1),
                import("java.lang.Math.max", false, 2),
                import("java.util.Collections", true, 3),
                import("java.util", true, 4),
            ],
            &[],
            &registry,
        )
        .unwrap();

        let kinds: Vec<_> = table.entries().iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ImportKind::Exact,
                ImportKind::Exact,
                ImportKind::WildcardStaticMember,
                ImportKind::WildcardPackage
            ]
        );
        assert!(matches!(
            &table.entries()[1].target,
            ImportTarget::StaticMember { member, .. } if member == "max"
        ));
        assert!(table.validate_members(&registry).is_ok());
    }

    #[test]
    fn reports_every_unresolved_import() {
        let registry = ClassRegistry::with_builtins();
        let errors = ImportTable::build(
            &[import("no.such.Type", false, 1), import("java.util", false, 2), import("nowhere", true, 3)],
            &[],
            &registry,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn unknown_static_members_fail_validation() {
        let registry = ClassRegistry::with_builtins();
        let table = ImportTable::build(&[import("java.lang.Math.nope", false, 1)], &[], &registry).unwrap();
        assert_eq!(table.validate_members(&registry).unwrap_err().len(), 1);
    }

    #[test]
    fn imports_are_visible_after_their_position() {
        let registry = ClassRegistry::with_builtins();
        let table = ImportTable::build(&[import("java.util.List", false, 5)], &[], &registry).unwrap();
        assert_eq!(table.visible(ImportKind::Exact, Span::new(4, 1, 1)).count(), 0);
        assert_eq!(table.visible(ImportKind::Exact, Span::new(6, 1, 1)).count(), 1);
    }

    #[test]
    fn implicit_packages_are_kept_apart() {
        let registry = ClassRegistry::with_builtins();
        let implicit = vec!["java.lang".to_string(), "java::lang".to_string()];
        let table = ImportTable::build(&[], &implicit, &registry).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.implicit(), &[vec!["java".to_string(), "lang".to_string()]]);
    }
}
