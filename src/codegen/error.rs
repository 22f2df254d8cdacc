//! Code generation errors

use inkwell::builder::BuilderError;
use thiserror::Error;

use crate::context::ValueType;

/// A name that could not be found in the context stack
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
}

/// Code generation errors
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("Function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("'{0}' is already defined")]
    Redefinition(String),

    #[error("{0} is not supported")]
    Unsupported(String),

    #[error("LLVM builder error: {0}")]
    Builder(#[from] BuilderError),

    /// LLVM's verifier output, unmodified
    #[error("Module verification failed: {0}")]
    Verification(String),

    #[error("Target error: {0}")]
    Target(String),

    #[error("JIT error: {0}")]
    Jit(String),
}

pub type CodegenResult<T> = Result<T, CodegenError>;
