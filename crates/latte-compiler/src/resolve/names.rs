//! Name resolution outside of local scopes.
//!
//! [`NameResolver`] answers "what does this name mean here" for one unit,
//! consulting in order:
//!
//! 1. exact imports (types and static members)
//! 2. wildcard static-member imports
//! 3. wildcard package imports
//! 4. classes of the unit's own package
//! 5. implicit package imports
//!
//! The first tier with a match wins. Two different matches inside one tier
//! make the name ambiguous. Names written with separators are fully
//! qualified and looked up directly.
//!
//! Locals, parameters and members of the enclosing class are handled by
//! the lowering pass before it falls back to this resolver.

use latte_core::{JvmType, QualifiedName, ResolveError, Span};
use latte_parser::{Path, TypeRef};
use latte_registry::ClassRegistry;

use super::imports::{ImportKind, ImportTable, ImportTarget, has_static_member};
use crate::hir::ResolvedSymbol;

/// What kind of symbol the use site accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Want {
    /// A type or a static member.
    Any,
    /// Only types; static-member imports are skipped.
    Type,
}

/// A path split into the symbol its leading segments name and the member
/// accesses that follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolution {
    pub symbol: ResolvedSymbol,
    pub rest: Vec<String>,
}

pub struct NameResolver<'a> {
    registry: &'a ClassRegistry,
    imports: &'a ImportTable,
    package: &'a [String],
}

impl<'a> NameResolver<'a> {
    pub fn new(registry: &'a ClassRegistry, imports: &'a ImportTable, package: &'a [String]) -> Self {
        Self {
            registry,
            imports,
            package,
        }
    }

    pub fn registry(&self) -> &'a ClassRegistry {
        self.registry
    }

    pub fn package(&self) -> &'a [String] {
        self.package
    }

    // ==========================================================================
    // Simple names
    // ==========================================================================

    /// Resolve a name without separators as seen at `at`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve_simple(&self, name: &str, at: Span, want: Want) -> Result<ResolvedSymbol, ResolveError> {
        let tiers: [&dyn Fn() -> Vec<ResolvedSymbol>; 5] = [
            &|| self.exact(name, at, want),
            &|| match want {
                Want::Any => self.static_wildcards(name, at),
                Want::Type => Vec::new(),
            },
            &|| self.package_wildcards(name, at),
            &|| self.lookup_in(self.package, name).into_iter().collect(),
            &|| {
                self.imports
                    .implicit()
                    .iter()
                    .filter_map(|package| self.lookup_in(package, name))
                    .collect()
            },
        ];

        for tier in tiers {
            if let Some(symbol) = decide(name, at, tier())? {
                tracing::trace!(name, resolved = ?symbol, "resolved name");
                return Ok(symbol);
            }
        }
        Err(ResolveError::unresolved(name, at))
    }

    /// Resolve a simple name that must be a type.
    pub fn resolve_type_name(&self, name: &str, at: Span) -> Result<QualifiedName, ResolveError> {
        match self.resolve_simple(name, at, Want::Type)? {
            ResolvedSymbol::Type(ty) => Ok(ty),
            ResolvedSymbol::StaticMember { .. } => Err(ResolveError::unresolved(name, at)),
        }
    }

    fn exact(&self, name: &str, at: Span, want: Want) -> Vec<ResolvedSymbol> {
        self.imports
            .visible(ImportKind::Exact, at)
            .filter_map(|import| match &import.target {
                ImportTarget::Type(ty) if ty.simple_name() == name => Some(ResolvedSymbol::Type(ty.clone())),
                ImportTarget::StaticMember { owner, member } if member == name && want == Want::Any => {
                    Some(ResolvedSymbol::StaticMember {
                        owner: owner.clone(),
                        member: member.clone(),
                    })
                }
                _ => None,
            })
            .collect()
    }

    fn static_wildcards(&self, name: &str, at: Span) -> Vec<ResolvedSymbol> {
        self.imports
            .visible(ImportKind::WildcardStaticMember, at)
            .filter_map(|import| match &import.target {
                ImportTarget::StaticMembers(owner) if has_static_member(self.registry, owner, name) => {
                    Some(ResolvedSymbol::StaticMember {
                        owner: owner.clone(),
                        member: name.to_string(),
                    })
                }
                _ => None,
            })
            .collect()
    }

    fn package_wildcards(&self, name: &str, at: Span) -> Vec<ResolvedSymbol> {
        self.imports
            .visible(ImportKind::WildcardPackage, at)
            .filter_map(|import| match &import.target {
                ImportTarget::Package(package) => self.lookup_in(package, name),
                _ => None,
            })
            .collect()
    }

    fn lookup_in(&self, package: &[String], name: &str) -> Option<ResolvedSymbol> {
        self.registry
            .lookup(package, name)
            .map(|entry| ResolvedSymbol::Type(entry.name.clone()))
    }

    // ==========================================================================
    // Paths
    // ==========================================================================

    /// Resolve `a.b.C.member...`. The longest registered class prefix wins;
    /// otherwise the first segment is resolved as a simple name. Segments
    /// after the symbol are returned as member accesses.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve_path(&self, segments: &[String], span: Span) -> Result<PathResolution, ResolveError> {
        let Some((first, _)) = segments.split_first() else {
            return Err(ResolveError::unresolved("", span));
        };

        for len in (2..=segments.len()).rev() {
            let candidate = QualifiedName::from_segments(&segments[..len]);
            if self.registry.contains(&candidate) {
                return Ok(PathResolution {
                    symbol: ResolvedSymbol::Type(candidate),
                    rest: segments[len..].to_vec(),
                });
            }
        }

        match self.resolve_simple(first, span, Want::Any) {
            Ok(symbol) => Ok(PathResolution {
                symbol,
                rest: segments[1..].to_vec(),
            }),
            Err(ResolveError::Unresolved { .. }) if segments.len() > 1 => {
                Err(ResolveError::unresolved(segments.join("."), span))
            }
            Err(error) => Err(error),
        }
    }

    /// Resolve a type written in a declaration.
    pub fn resolve_type_path(&self, path: &Path) -> Result<QualifiedName, ResolveError> {
        if path.is_simple() {
            return self.resolve_type_name(path.last(), path.span);
        }
        let direct = path.to_qualified();
        if self.registry.contains(&direct) {
            return Ok(direct);
        }
        Err(ResolveError::unresolved(path.to_string(), path.span))
    }

    pub fn resolve_type_ref(&self, ty: &TypeRef) -> Result<JvmType, ResolveError> {
        Ok(match ty {
            TypeRef::Unit(_) => JvmType::Void,
            TypeRef::Primitive(kind, _) => JvmType::Primitive(*kind),
            TypeRef::Named(path) => JvmType::reference(&self.resolve_type_path(path)?),
            TypeRef::Array(component, _) => JvmType::Array(Box::new(self.resolve_type_ref(component)?)),
        })
    }
}

/// Pick the single candidate of a tier.
fn decide(name: &str, at: Span, candidates: Vec<ResolvedSymbol>) -> Result<Option<ResolvedSymbol>, ResolveError> {
    let mut distinct: Vec<ResolvedSymbol> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !distinct.contains(&candidate) {
            distinct.push(candidate);
        }
    }

    match distinct.len() {
        0 => Ok(None),
        1 => Ok(distinct.pop()),
        _ => Err(ResolveError::Ambiguous {
            name: name.to_string(),
            candidates: distinct.iter().map(describe).collect(),
            span: at,
        }),
    }
}

fn describe(symbol: &ResolvedSymbol) -> String {
    match symbol {
        ResolvedSymbol::Type(ty) => ty.dotted(),
        ResolvedSymbol::StaticMember { owner, member } => format!("{}.{member}", owner.dotted()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latte_parser::ImportDecl;
    use latte_registry::ClassEntry;

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::with_builtins();
        for name in ["p.a.X", "p.b.X", "p.c.Only", "mine.X", "mine.Local"] {
            registry.register(ClassEntry::class(QualifiedName::parse(name))).unwrap();
        }
        registry
    }

    fn imports(registry: &ClassRegistry, written: &[(&str, bool)]) -> ImportTable {
        let decls: Vec<ImportDecl> = written
            .iter()
            .enumerate()
            .map(|(i, (path, wildcard))| ImportDecl {
                path: Path::new(path.split('.').map(str::to_string).collect(), Span::default()),
                wildcard: *wildcard,
                span: Span::new(i as u32 + 1, 1, 1),
            })
            .collect();
        ImportTable::build(&decls, &["java.lang".to_string()], registry).unwrap()
    }

    const USE: Span = Span {
        line: 100,
        col: 1,
        len: 1,
    };

    fn package() -> Vec<String> {
        vec!["mine".to_string()]
    }

    #[test]
    fn exact_import_beats_wildcards() {
        let registry = registry();
        let table = imports(&registry, &[("p.a", true), ("p.b.X", false)]);
        let package = package();
        let names = NameResolver::new(&registry, &table, &package);
        assert_eq!(
            names.resolve_simple("X", USE, Want::Any).unwrap(),
            ResolvedSymbol::Type(QualifiedName::parse("p.b.X"))
        );
    }

    #[test]
    fn wildcard_package_beats_same_package() {
        let registry = registry();
        let table = imports(&registry, &[("p.a", true)]);
        let package = package();
        let names = NameResolver::new(&registry, &table, &package);
        assert_eq!(names.resolve_type_name("X", USE).unwrap(), QualifiedName::parse("p.a.X"));
        assert_eq!(names.resolve_type_name("Local", USE).unwrap(), QualifiedName::parse("mine.Local"));
    }

    #[test]
    fn two_wildcard_packages_are_ambiguous() {
        let registry = registry();
        let table = imports(&registry, &[("p.a", true), ("p.b", true)]);
        let package = package();
        let names = NameResolver::new(&registry, &table, &package);
        let error = names.resolve_simple("X", USE, Want::Any).unwrap_err();
        assert!(matches!(error, ResolveError::Ambiguous { ref candidates, .. } if candidates.len() == 2));
        // `p.c` is never imported
        assert!(names.resolve_simple("Only", USE, Want::Any).is_err());
    }

    #[test]
    fn static_wildcard_exposes_members() {
        let registry = registry();
        let table = imports(&registry, &[("java.util.Collections", true)]);
        let package = package();
        let names = NameResolver::new(&registry, &table, &package);
        assert_eq!(
            names.resolve_simple("emptyList", USE, Want::Any).unwrap(),
            ResolvedSymbol::StaticMember {
                owner: QualifiedName::parse("java.util.Collections"),
                member: "emptyList".into()
            }
        );
        assert!(names.resolve_simple("emptyList", USE, Want::Type).is_err());
    }

    #[test]
    fn implicit_imports_come_last() {
        let registry = registry();
        let table = imports(&registry, &[]);
        let package = package();
        let names = NameResolver::new(&registry, &table, &package);
        assert_eq!(names.resolve_type_name("String", USE).unwrap(), QualifiedName::parse("java.lang.String"));
        assert!(matches!(
            names.resolve_simple("Nope", USE, Want::Any),
            Err(ResolveError::Unresolved { .. })
        ));
    }

    #[test]
    fn imports_before_their_line_are_invisible() {
        let registry = registry();
        let table = imports(&registry, &[("p.b.X", false)]);
        let package = package();
        let names = NameResolver::new(&registry, &table, &package);
        // before the import, same-package `mine.X` is found
        assert_eq!(
            names.resolve_type_name("X", Span::new(1, 0, 1)).unwrap(),
            QualifiedName::parse("mine.X")
        );
    }

    #[test]
    fn paths_split_into_type_and_members() {
        let registry = registry();
        let table = imports(&registry, &[]);
        let package = package();
        let names = NameResolver::new(&registry, &table, &package);

        let segments: Vec<String> = ["java", "lang", "System", "out"].iter().map(|s| s.to_string()).collect();
        let resolved = names.resolve_path(&segments, USE).unwrap();
        assert_eq!(resolved.symbol, ResolvedSymbol::Type(QualifiedName::parse("java.lang.System")));
        assert_eq!(resolved.rest, vec!["out".to_string()]);

        let short: Vec<String> = ["System", "out"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names.resolve_path(&short, USE).unwrap(), resolved);

        let missing: Vec<String> = ["no", "such", "Thing"].iter().map(|s| s.to_string()).collect();
        assert!(matches!(
            names.resolve_path(&missing, USE),
            Err(ResolveError::Unresolved { name, .. }) if name == "no.such.Thing"
        ));
    }

    #[test]
    fn type_refs() {
        let registry = registry();
        let table = imports(&registry, &[]);
        let package = package();
        let names = NameResolver::new(&registry, &table, &package);
        let list = TypeRef::Array(
            Box::new(TypeRef::Named(Path::new(vec!["java".into(), "util".into(), "List".into()], USE))),
            USE,
        );
        assert_eq!(names.resolve_type_ref(&list).unwrap().descriptor(), "[Ljava/util/List;");
        assert_eq!(names.resolve_type_ref(&TypeRef::Unit(USE)).unwrap(), JvmType::Void);
    }
}
