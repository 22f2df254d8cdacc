//! Blitz3D Dialect Compiler
//!
//! A compiler for the BASIC-like language of Blitz3D, built on LLVM.
//! Programs are lowered to a single `bbmain` entry procedure plus one LLVM
//! function per user `FUNCTION`, and then either turned into a native
//! executable (host assembly linked with a small C runtime) or run directly
//! in a JIT.
//!
//! # Architecture
//!
//! ```text
//! Source Code (.bb)
//!       │
//!       ▼
//! ┌─────────────┐
//! │    Lexer    │  → Tokens
//! └─────────────┘
//!       │
//!       ▼
//! ┌─────────────┐
//! │   Parser    │  → AST
//! └─────────────┘
//!       │
//!       ▼
//! ┌─────────────┐
//! │  Code Gen   │  → LLVM module (under a context stack)
//! └─────────────┘
//!       │
//!       ▼
//! ┌─────────────┐
//! │  Optimize   │  → assembly + cc, or JIT
//! └─────────────┘
//! ```

pub mod lexer;
pub mod token;
pub mod span;
pub mod ast;
pub mod parser;
pub mod context;
pub mod codegen;
pub mod runtime;
pub mod link;
pub mod error;

use std::path::Path;

use tracing::info;

// Re-exports for convenience
pub use codegen::{CompiledModule, Generator, OptLevel, RuntimeBindings};
pub use error::{Error, Result};
pub use lexer::Lexer;
pub use link::BuildConfig;
pub use parser::parse;
pub use span::Span;
pub use token::{Token, TokenKind};

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File extension for Blitz source files
pub const FILE_EXTENSION: &str = "bb";

/// Parse and lower `source` into a verified module named `name`.
pub fn compile_source<'ctx>(
    llvm: &'ctx inkwell::context::Context,
    source: &str,
    name: &str,
) -> Result<CompiledModule<'ctx>> {
    let program = parse(source)?;
    let module = Generator::new(llvm, name).generate(&program, context::Context::new())?;
    info!(module = name, "compiled");
    Ok(module)
}

/// LLVM IR for `source`, optionally after one optimization run
pub fn emit_ir(source: &str, optimize: Option<OptLevel>) -> Result<String> {
    let llvm = inkwell::context::Context::create();
    let module = compile_source(&llvm, source, "bbprogram")?;
    if let Some(level) = optimize {
        module.optimize(level)?;
    }
    Ok(module.ir())
}

/// Optimized host assembly for `source`
pub fn emit_assembly(source: &str, level: OptLevel) -> Result<String> {
    let llvm = inkwell::context::Context::create();
    let module = compile_source(&llvm, source, "bbprogram")?;
    module.optimize(level)?;
    Ok(module.emit_assembly()?)
}

/// Compile `source` into a native executable at `output`
pub fn build_native(source: &str, output: &Path, config: &BuildConfig) -> Result<()> {
    let assembly = emit_assembly(source, config.opt_level)?;
    link::build_executable(&assembly, output, config)?;
    Ok(())
}

/// Compile `source` and run `bbmain` in the JIT
pub fn run_jit(source: &str, level: OptLevel, bindings: &RuntimeBindings) -> Result<()> {
    let llvm = inkwell::context::Context::create();
    let module = compile_source(&llvm, source, "bbprogram")?;
    module.optimize(level)?;
    module.jit(bindings)?.run_main()?;
    Ok(())
}

/// Like [`run_jit`] with the host runtime, returning what the program printed
pub fn run_jit_captured(source: &str, level: OptLevel) -> Result<String> {
    let llvm = inkwell::context::Context::create();
    let module = compile_source(&llvm, source, "bbprogram")?;
    module.optimize(level)?;
    let session = module.jit(&RuntimeBindings::default())?;
    Ok(session.run_main_captured()?)
}
