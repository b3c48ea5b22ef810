use std::fmt::Write;

use crate::frontend::token::{Token, TokenKind};

/// Prints a token stream, one token per line, for `--tokens`.
pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the source text instead of Debug
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Token]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for token in tokens {
            self.render_one(&mut out, token);
        }
        out
    }

    fn render_one(&self, out: &mut String, token: &Token) {
        let line = token.span.line;
        let col = token.span.col;

        let kind = Self::category(token.kind);
        let colr = if self.color { Self::color(token.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        // writing into a String cannot fail
        let _ = if self.show_debug_repr {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} {:?} {:?}{}",
                line, col, colr, kind, token.kind, token.literal, reset
            )
        } else {
            match token.kind {
                TokenKind::Semi if token.literal == "\n" => writeln!(
                    out,
                    "[{:02}:{:02}] {}{:<8} NEWLINE{}",
                    line, col, colr, kind, reset
                ),
                _ => writeln!(
                    out,
                    "[{:02}:{:02}] {}{:<8} {}{}",
                    line, col, colr, kind, token, reset
                ),
            }
        };
    }

    fn category(kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Semi => "SEP",
            Eof => "EOF",

            // literals
            Number => "NUMBER",
            Str => "STRING",
            True | False => "BOOL",
            Nil => "NIL",

            // names
            Ident => "IDENT",

            // structure
            LParen | RParen => "PAREN",
            LBracket | RBracket => "BRACKET",
            LBrace | RBrace => "BRACE",
            Comma | Colon | Arrow => "PUNCT",

            // ops / comparisons
            Plus | Minus | Star | Slash | FloorDiv | Percent | Caret | Bang | And | Or | BitAnd
            | BitOr | Dot => "OP",
            Eq | NotEq | Lt | LtEq | Gt | GtEq => "CMP",
            Assign | Declare => "BIND",

            // everything else = keyword
            _ => "KEYWORD",
        }
    }

    fn color(kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Semi | Eof => Self::DIM,
            Str => Self::GRN,
            Number | True | False | Nil => Self::CYN,
            Ident => Self::YEL,
            Plus | Minus | Star | Slash | FloorDiv | Percent | Caret | Bang | And | Or | BitAnd
            | BitOr | Dot => Self::MAG,
            Eq | NotEq | Lt | LtEq | Gt | GtEq | Assign | Declare => Self::MAG,
            k if k.is_keyword() => Self::BLU,
            _ => Self::RESET,
        }
    }
}
