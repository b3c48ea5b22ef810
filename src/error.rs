use crate::bytecode::compile_error::CompileError;
use crate::frontend::lexer::LexerError;
use crate::frontend::parser_error::ParseErrors;

/// Any failure on the way from source text to bytecode.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lexer error: {0}")]
    Lex(#[from] LexerError),

    #[error("parse error:\n{0}")]
    Parse(#[from] ParseErrors),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}
