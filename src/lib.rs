//! # Quill
//!
//! Front end and bytecode compiler for Quill, a small dynamically typed
//! scripting language.
//!
//! ```text
//! source ─► Lexer ─► Parser ─► Program ─► Compiler ─► ProgramBc
//! ```
//!
//! The compiler emits a flat byte stream with constant, name and jump
//! tables; executing it is left to a separate virtual machine.

pub mod bytecode;
pub mod error;
pub mod frontend;
pub mod lang;

pub use error::Error;

use crate::bytecode::{ProgramBc, compile::Compiler};
use crate::frontend::{lexer::Lexer, parser::Parser};
use crate::lang::program::Program;

/// Tokenizes and parses `source`. Fails with every syntax error found.
pub fn parse_source(source: &str) -> Result<Program, Error> {
    let tokens = Lexer::new(source).tokenize()?;
    let program = Parser::new(tokens).parse()?;
    Ok(program)
}

/// Runs the whole pipeline on `source`.
pub fn compile_source(source: &str) -> Result<ProgramBc, Error> {
    let program = parse_source(source)?;
    let bc = Compiler::new().compile_program(&program)?;
    Ok(bc)
}
