use crate::frontend::token::{Token, TokenKind};

/// Errors that abort compilation of a unit.
///
/// Source-anchored variants carry the 1-based position of the token that
/// caused them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("{line}:{col}: can only export identifiers, or a tuple thereof")]
    MalformedExport { line: usize, col: usize },

    #[error("{line}:{col}: for-loop variable must be an identifier, got `{found}`")]
    InvalidLoopCounter {
        found: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: `{statement}` statements are not supported by this compiler")]
    UnsupportedStatement {
        statement: &'static str,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: `{keyword}` outside of a loop")]
    LoopControlOutsideLoop {
        keyword: &'static str,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: cannot assign to `{target}`")]
    InvalidAssignmentTarget {
        target: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: member name must be an identifier, got `{found}`")]
    InvalidMember {
        found: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: operator `{operator}` cannot be compiled here")]
    UnsupportedOperator {
        operator: TokenKind,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: {count} elements exceed the limit of {max}")]
    TooManyElements {
        count: usize,
        max: usize,
        line: usize,
        col: usize,
    },

    #[error("{pool} pool is full ({max} entries)")]
    PoolOverflow { pool: &'static str, max: usize },

    /// A forward jump whose target was never filled in.
    #[error("internal: jump slot {slot} was never patched")]
    UnpatchedJump { slot: usize },
}

impl CompileError {
    pub fn malformed_export(token: &Token) -> Self {
        CompileError::MalformedExport {
            line: token.span.line,
            col: token.span.col,
        }
    }

    pub fn invalid_loop_counter(token: &Token, found: impl ToString) -> Self {
        CompileError::InvalidLoopCounter {
            found: found.to_string(),
            line: token.span.line,
            col: token.span.col,
        }
    }

    pub fn unsupported_statement(token: &Token, statement: &'static str) -> Self {
        CompileError::UnsupportedStatement {
            statement,
            line: token.span.line,
            col: token.span.col,
        }
    }

    pub fn outside_loop(token: &Token, keyword: &'static str) -> Self {
        CompileError::LoopControlOutsideLoop {
            keyword,
            line: token.span.line,
            col: token.span.col,
        }
    }

    pub fn invalid_target(token: &Token, target: impl ToString) -> Self {
        CompileError::InvalidAssignmentTarget {
            target: target.to_string(),
            line: token.span.line,
            col: token.span.col,
        }
    }

    pub fn invalid_member(token: &Token, found: impl ToString) -> Self {
        CompileError::InvalidMember {
            found: found.to_string(),
            line: token.span.line,
            col: token.span.col,
        }
    }

    pub fn unsupported_operator(token: &Token) -> Self {
        CompileError::UnsupportedOperator {
            operator: token.kind,
            line: token.span.line,
            col: token.span.col,
        }
    }

    pub fn too_many_elements(token: &Token, count: usize, max: usize) -> Self {
        CompileError::TooManyElements {
            count,
            max,
            line: token.span.line,
            col: token.span.col,
        }
    }
}
