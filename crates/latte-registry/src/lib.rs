//! Class registry for the Latte compiler.
//!
//! Everything the resolver and the generator know about classes lives here:
//! the JDK and runtime classes the compiler ships with, the headers of the
//! units being compiled, and any library class registered from its class
//! file bytes.
//!
//! # Example
//!
//! ```
//! use latte_core::QualifiedName;
//! use latte_registry::ClassRegistry;
//!
//! let registry = ClassRegistry::with_builtins();
//! let list = QualifiedName::parse("java.util.ArrayList");
//! assert!(registry.is_subclass(&list, &QualifiedName::parse("java.util.List")));
//! ```

mod builtins;
mod classfile;
mod entry;
mod error;
mod package_tree;
mod registry;

pub use builtins::register_builtins;
pub use classfile::{ClassFileError, read_class};
pub use entry::{AccessFlags, ClassEntry, ClassKind, FieldEntry, MethodEntry};
pub use error::RegistryError;
pub use package_tree::{PackageEdge, PackageTree};
pub use registry::{ClassRegistry, SamError};
