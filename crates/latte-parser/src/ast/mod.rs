//! Abstract syntax tree for Latte.
//!
//! Nodes own their data; nothing borrows from the element tree or the
//! scanner arena, so a parsed unit can outlive both.

pub mod decl;
pub mod expr;
pub mod ops;
pub mod stmt;
pub mod types;

pub use decl::*;
pub use expr::*;
pub use ops::*;
pub use stmt::*;
pub use types::*;
