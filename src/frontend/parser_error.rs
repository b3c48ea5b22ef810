use crate::frontend::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// No parser is registered for a token in the position it appeared, or
    /// a specific token was required and something else was found.
    UnexpectedToken,
    /// A number literal that does not convert to a 64-bit float.
    InvalidNumber,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorKind::UnexpectedToken => write!(f, "unexpected token"),
            ParseErrorKind::InvalidNumber => write!(f, "invalid number"),
        }
    }
}

/// A parsing error with source location.
///
/// `line` and `col` are 1-based positions taken from the offending token.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{line}:{col}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl ParseError {
    pub fn at(kind: ParseErrorKind, token: &Token, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            line: token.span.line,
            col: token.span.col,
        }
    }
}

/// Every error collected while parsing one compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseErrors(pub Vec<ParseError>);

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}
