//! # Quill syntax tree
//!
//! The tree produced by the parser and consumed by the bytecode compiler,
//! plus the constant values the compiler pools.
//!
//! Nodes own their children exclusively and carry the token they started
//! at, so every diagnostic can point back at source.

pub mod node;
pub mod program;
pub mod value;
