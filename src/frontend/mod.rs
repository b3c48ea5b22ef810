//! Source text to syntax tree: tokens, the precedence table, and the
//! recovering parser.

pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod precedence;
pub mod token;
pub mod token_dumper;
