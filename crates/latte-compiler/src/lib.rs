//! Latte Compiler
//!
//! Resolves parsed Latte units and generates JVM class files.
//!
//! ## Architecture
//!
//! - **Headers**: every declared type is registered, first as a skeleton,
//!   then with its full header (parents, fields, method descriptors)
//! - **Resolution**: imports are classified and every body is lowered into
//!   the [`hir`] tree with all names bound
//! - **Generation**: the [`hir`] tree is emitted as class files, one per
//!   class, one per lambda
//!
//! ## Modules
//!
//! - [`bytecode`]: class file model (constant pool, opcodes, writer, disassembler)
//! - [`emit`]: per-method instruction emitter with labels and stack tracking
//! - [`hir`]: resolved tree handed from the resolver to the generator
//! - [`resolve`]: imports, name resolution and body lowering
//! - [`codegen`]: bytecode generation, lambda synthesis, `synchronized`
//! - [`compiler`]: the batch [`Compiler`]

pub mod bytecode;
pub mod codegen;
pub mod compiler;
pub mod emit;
pub mod hir;
pub mod resolve;
mod scope;

pub use codegen::{AdapterCache, GenOptions, GeneratedClass, generate};
pub use compiler::{CompiledClasses, Compiler};
pub use hir::ResolvedUnit;
pub use resolve::{ImportTable, NameResolver, resolve};
