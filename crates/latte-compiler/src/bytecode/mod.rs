//! Class file model.
//!
//! - [`Opcode`]: the JVM instruction set
//! - [`ConstantPool`]: per-class, deduplicated constants
//! - [`CodeBuffer`] and [`CodeAttribute`]: method bodies
//! - [`ClassWriter`]: serializes a whole class
//! - [`disassemble`]: reads a class back, down to instructions

mod class_writer;
mod code;
mod constant;
pub mod disasm;
mod opcode;

pub use class_writer::{ClassWriter, MAJOR_VERSION, MINOR_VERSION};
pub use code::{CodeAttribute, CodeBuffer, ExceptionEntry};
pub use constant::{Constant, ConstantPool};
pub use disasm::{ClassDump, CodeDump, DisasmError, Instruction, MethodDump, Operand, disassemble};
pub use opcode::Opcode;
