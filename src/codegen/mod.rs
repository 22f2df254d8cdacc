//! LLVM code generation
//!
//! Lowers a parsed [`Program`](crate::ast::Program) to an LLVM module with
//! one `bbmain` entry procedure, then optimizes it, emits host assembly, or
//! runs it in a JIT.

mod error;
mod generator;
mod jit;
mod module;
pub mod runtime;

pub use error::*;
pub use generator::*;
pub use jit::*;
pub use module::*;
