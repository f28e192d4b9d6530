//! Latte
//!
//! A compiler for the Latte language targeting JVM class files.
//!
//! Source units in either surface syntax (braces or indentation) are
//! scanned into one canonical element tree, parsed, resolved against a
//! class registry and generated into class files, one per class and one per
//! lambda.
//!
//! # Example
//!
//! ```
//! let classes = latte::compile_sources(&[(
//!     "Counter.lt",
//!     "class Counter\n  def twice(x:int):int = x * 2\n",
//! )])
//! .unwrap();
//! assert_eq!(classes.names().collect::<Vec<_>>(), vec!["Counter"]);
//! ```
//!
//! # Crates
//!
//! - [`latte_core`]: spans, names, the JVM type model, errors, diagnostics, configuration
//! - [`latte_scanner`]: the layout scanner
//! - [`latte_parser`]: element tree to AST
//! - [`latte_registry`]: the class registry
//! - [`latte_compiler`]: resolution, bytecode generation and the batch compiler

pub use bumpalo::Bump;

pub use latte_compiler::bytecode::{self, ClassDump, disassemble};
pub use latte_compiler::{AdapterCache, CompiledClasses, Compiler, GeneratedClass};
pub use latte_core::{
    CompilerConfig, Diagnostic, DiagnosticKind, Diagnostics, ErrorCode, JvmType, LatteError, MethodDescriptor,
    PrimitiveKind, QualifiedName, ScannerMode, Span,
};
pub use latte_parser::{CompilationUnit, parse, parse_source};
pub use latte_registry::{ClassEntry, ClassRegistry};
pub use latte_scanner::{ElementTree, ScannedUnit, scan, scan_unit};

/// Compile a batch of `(logical name, source)` units with the default
/// configuration.
pub fn compile_sources<N, S>(units: &[(N, S)]) -> Result<CompiledClasses, Diagnostics>
where
    N: AsRef<str>,
    S: AsRef<str>,
{
    Compiler::default().compile(units)
}

/// Compile a batch of units with `config`.
pub fn compile_sources_with<N, S>(config: CompilerConfig, units: &[(N, S)]) -> Result<CompiledClasses, Diagnostics>
where
    N: AsRef<str>,
    S: AsRef<str>,
{
    Compiler::new(config).compile(units)
}

pub mod prelude {
    pub use crate::{
        CompiledClasses, Compiler, CompilerConfig, Diagnostics, ScannerMode, compile_sources, compile_sources_with,
    };
}
