//! ClassRegistry - every class the compiler can see.
//!
//! # Storage Model
//!
//! - **Classes**: all [`ClassEntry`]s stored in one map by [`ClassHash`]
//! - **Packages**: a [`PackageTree`] indexing simple names per package, used
//!   for wildcard and same-package lookups
//!
//! # Lifecycle
//!
//! The registry is filled single-threaded: built-ins first, then library
//! class files, then the headers of every unit in a batch. Once body
//! compilation starts it is only read, so it can be shared by reference
//! between units compiled on different threads.

use latte_core::{ClassHash, QualifiedName};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::{ClassEntry, FieldEntry, MethodEntry, PackageTree, RegistryError, builtins, classfile};

/// Why a type cannot be the target of a lambda.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamError {
    #[error("'{0}' is not registered")]
    Unknown(String),

    #[error("'{0}' is neither an interface nor an abstract class")]
    NotAbstract(String),

    #[error("'{0}' has no abstract method")]
    NoAbstractMethod(String),

    #[error("'{name}' has several abstract methods: {}", methods.join(", "))]
    SeveralAbstractMethods { name: String, methods: Vec<String> },
}

#[derive(Default, Clone)]
pub struct ClassRegistry {
    classes: FxHashMap<ClassHash, ClassEntry>,
    packages: PackageTree,
}

impl ClassRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the JDK and runtime classes the compiler
    /// knows without reading any class file.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register_builtins(&mut registry);
        registry
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    pub fn register(&mut self, entry: ClassEntry) -> Result<ClassHash, RegistryError> {
        let hash = entry.hash();
        if !self.packages.insert_class(&entry.name.package, &entry.name.name, hash) {
            return Err(RegistryError::DuplicateClass(entry.name.dotted()));
        }
        tracing::trace!(class = %entry.name, methods = entry.methods.len(), "registered class");
        self.classes.insert(hash, entry);
        Ok(hash)
    }

    /// Store `entry`, replacing any class already registered under its name.
    ///
    /// Headers are registered in two steps: a bare entry first so every
    /// unit of a batch can name every class, then the complete one.
    pub fn replace(&mut self, entry: ClassEntry) -> Option<ClassEntry> {
        let hash = entry.hash();
        self.packages.insert_class(&entry.name.package, &entry.name.name, hash);
        self.classes.insert(hash, entry)
    }

    /// Register a library class from its class file bytes.
    pub fn register_class_file(&mut self, bytes: &[u8]) -> Result<ClassHash, RegistryError> {
        let entry = classfile::read_class(bytes)?;
        self.register(entry)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn get(&self, name: &QualifiedName) -> Option<&ClassEntry> {
        self.classes.get(&name.class_hash())
    }

    pub fn get_by_hash(&self, hash: ClassHash) -> Option<&ClassEntry> {
        self.classes.get(&hash)
    }

    /// Lookup by any spelling of the path (`a.b.C`, `a::b::C`, `a/b/C`).
    pub fn get_by_path(&self, path: &str) -> Option<&ClassEntry> {
        self.get(&QualifiedName::parse(path))
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.classes.contains_key(&name.class_hash())
    }

    /// The class `simple` declared directly in `package`.
    pub fn lookup<S: AsRef<str>>(&self, package: &[S], simple: &str) -> Option<&ClassEntry> {
        let hash = self.packages.class_in(package, simple)?;
        self.classes.get(&hash)
    }

    pub fn has_package<S: AsRef<str>>(&self, package: &[S]) -> bool {
        self.packages.has_package(package)
    }

    pub fn classes_in_package<S: AsRef<str>>(&self, package: &[S]) -> Vec<&str> {
        self.packages.classes_in(package)
    }

    pub fn packages(&self) -> &PackageTree {
        &self.packages
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    // ==========================================================================
    // Hierarchy
    // ==========================================================================

    /// `name` followed by every registered super class and interface,
    /// breadth first, each once. Unregistered ancestors are skipped.
    pub fn supertypes(&self, name: &QualifiedName) -> Vec<&ClassEntry> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(name.clone());

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.class_hash()) {
                continue;
            }
            let Some(entry) = self.get(&next) else {
                continue;
            };
            if let Some(super_class) = &entry.super_class {
                queue.push_back(super_class.clone());
            }
            queue.extend(entry.interfaces.iter().cloned());
            out.push(entry);
        }
        out
    }

    /// Whether a value of `sub` can be used where `sup` is expected.
    pub fn is_subclass(&self, sub: &QualifiedName, sup: &QualifiedName) -> bool {
        if sub == sup || sup.dotted() == "java.lang.Object" {
            return true;
        }
        let target = sup.class_hash();
        self.supertypes(sub).iter().any(|entry| entry.hash() == target)
    }

    /// Methods named `name` visible on `owner`, nearest declaration first.
    /// An inherited method hidden by an override with the same descriptor is
    /// left out. Constructors are never inherited.
    pub fn find_methods(&self, owner: &QualifiedName, name: &str) -> Vec<(&ClassEntry, &MethodEntry)> {
        if name == "<init>" {
            return self
                .get(owner)
                .map(|entry| entry.constructors().map(|m| (entry, m)).collect())
                .unwrap_or_default();
        }

        let mut found: Vec<(&ClassEntry, &MethodEntry)> = Vec::new();
        for entry in self.supertypes(owner) {
            for method in entry.methods_named(name) {
                if !found.iter().any(|(_, m)| m.same_signature(method)) {
                    found.push((entry, method));
                }
            }
        }
        found
    }

    /// The nearest field `name` visible on `owner`.
    pub fn find_field(&self, owner: &QualifiedName, name: &str) -> Option<(&ClassEntry, &FieldEntry)> {
        self.supertypes(owner)
            .into_iter()
            .find_map(|entry| entry.field(name).map(|field| (entry, field)))
    }

    /// The single abstract method a lambda targeting `name` implements.
    pub fn single_abstract_method(&self, name: &QualifiedName) -> Result<&MethodEntry, SamError> {
        let entry = self.get(name).ok_or_else(|| SamError::Unknown(name.dotted()))?;
        if !entry.is_interface() && !entry.is_abstract() {
            return Err(SamError::NotAbstract(name.dotted()));
        }

        let hierarchy = self.supertypes(name);
        let concrete: Vec<&MethodEntry> = hierarchy
            .iter()
            .flat_map(|e| &e.methods)
            .filter(|m| !m.is_abstract() && !m.is_static())
            .collect();

        let mut abstract_methods: Vec<&MethodEntry> = Vec::new();
        for method in hierarchy.iter().flat_map(|e| &e.methods) {
            if !method.is_abstract() || method.is_static() || is_object_method(method) {
                continue;
            }
            if concrete.iter().any(|c| c.same_signature(method)) {
                continue;
            }
            if !abstract_methods.iter().any(|m| m.same_signature(method)) {
                abstract_methods.push(method);
            }
        }

        match abstract_methods.as_slice() {
            [] => Err(SamError::NoAbstractMethod(name.dotted())),
            [sam] => Ok(sam),
            several => Err(SamError::SeveralAbstractMethods {
                name: name.dotted(),
                methods: several.iter().map(|m| format!("{}{}", m.name, m.descriptor)).collect(),
            }),
        }
    }
}

/// Public `Object` methods redeclared by interfaces (`Comparator.equals`)
/// do not count as abstract.
fn is_object_method(method: &MethodEntry) -> bool {
    let desc = method.descriptor.to_string();
    matches!(
        (method.name.as_str(), desc.as_str()),
        ("equals", "(Ljava/lang/Object;)Z") | ("hashCode", "()I") | ("toString", "()Ljava/lang/String;")
    )
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.classes.len())
            .field("packages", &self.packages.package_count())
            .finish()
    }
}
