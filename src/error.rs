//! Crate-level error type for the compilation pipeline

use thiserror::Error;

use crate::codegen::CodegenError;
use crate::lexer::LexErrors;
use crate::link::BuildError;
use crate::parser::ParseError;

/// Any failure of a pipeline stage
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] LexErrors),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
