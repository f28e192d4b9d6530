//! Core types shared by every phase of the Latte compiler.
//!
//! - [`Span`] for source positions
//! - [`QualifiedName`] and [`ClassHash`] for class identity
//! - [`PrimitiveKind`], [`JvmType`] and [`MethodDescriptor`] for the JVM type model
//! - [`LatteError`] and its per-phase variants, plus [`Diagnostics`]
//! - [`CompilerConfig`] and [`ScannerMode`]

mod class_hash;
mod config;
mod diagnostics;
mod error;
mod primitive;
mod qualified_name;
mod span;
mod types;

pub use class_hash::{ClassHash, hash_constants};
pub use config::{CompilerConfig, DEFAULT_IMPLICIT_IMPORTS, ScannerMode};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{CodeGenError, ErrorCode, LatteError, ParseErrorKind, ResolveError, SyntaxError};
pub use primitive::{PrimitiveKind, StackKind};
pub use qualified_name::{PATH_SEPARATORS, QualifiedName, has_path_separator, split_path};
pub use span::Span;
pub use types::{DescriptorError, JvmType, MethodDescriptor, OBJECT, STRING};

/// Literal float that can be hashed and compared, for constant pools and AST
/// equality.
pub type FloatLit = ordered_float::OrderedFloat<f64>;
