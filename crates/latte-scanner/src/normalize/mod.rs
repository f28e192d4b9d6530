//! The two surface-syntax front ends.
//!
//! Each normalizer consumes the shared [`Lexer`](crate::lexer::Lexer) stream
//! and drives a [`TreeBuilder`](crate::builder::TreeBuilder). They differ
//! only in how a line start is interpreted.

mod brace;
mod indent;

pub use brace::normalize_brace;
pub use indent::normalize_indent;
