/// The kind of a lexical token.
///
/// The enum is closed and `Eof` is always the last variant, so
/// `kind as usize` is a valid index into tables of `TokenKind::COUNT` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    // Literals
    Ident,
    Number,
    Str,
    True,
    False,
    Nil,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    FloorDiv,
    Percent,
    Caret,

    // Logic & comparison
    Bang,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,

    // Binding & punctuation
    Assign,
    Declare,
    Comma,
    Colon,
    Dot,
    Arrow,
    Semi,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Keywords
    If,
    Then,
    Else,
    Match,
    While,
    For,
    In,
    Return,
    Break,
    Next,
    Export,
    Import,
    Map,
    Set,
    Type,

    // Special
    Eof,
}

impl TokenKind {
    /// Number of token kinds, used to size dispatch tables.
    pub const COUNT: usize = TokenKind::Eof as usize + 1;

    /// Maps an identifier-shaped word to its keyword kind, if it is one.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "nil" => TokenKind::Nil,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "match" => TokenKind::Match,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "next" => TokenKind::Next,
            "export" => TokenKind::Export,
            "import" => TokenKind::Import,
            "map" => TokenKind::Map,
            "set" => TokenKind::Set,
            "type" => TokenKind::Type,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns true if a newline after this token terminates a statement.
    pub fn ends_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::Number
                | TokenKind::Str
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Break
                | TokenKind::Next
                | TokenKind::Return
        )
    }

    /// Returns true for reserved words.
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::Match
                | TokenKind::While
                | TokenKind::For
                | TokenKind::In
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Next
                | TokenKind::Export
                | TokenKind::Import
                | TokenKind::Map
                | TokenKind::Set
                | TokenKind::Type
        )
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::Str => "string",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Nil => "nil",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::FloorDiv => "//",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::Eq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::BitAnd => "&",
            TokenKind::BitOr => "|",
            TokenKind::Assign => "=",
            TokenKind::Declare => ":=",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Arrow => "->",
            TokenKind::Semi => ";",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::Match => "match",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Return => "return",
            TokenKind::Break => "break",
            TokenKind::Next => "next",
            TokenKind::Export => "export",
            TokenKind::Import => "import",
            TokenKind::Map => "map",
            TokenKind::Set => "set",
            TokenKind::Type => "type",
            TokenKind::Eof => "EOF",
        };
        write!(f, "{}", text)
    }
}

/// 1-based source position of a token's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

/// A lexical token: its kind, the exact source text, and where it started.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            literal: literal.into(),
            span,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// A terminator the lexer inserted for a line break, as opposed to `;`.
    pub fn is_newline(&self) -> bool {
        self.kind == TokenKind::Semi && self.literal == "\n"
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Str => write!(f, "\"{}\"", self.literal),
            TokenKind::Ident | TokenKind::Number => write!(f, "{}", self.literal),
            TokenKind::Semi if self.is_newline() => write!(f, "newline"),
            other => write!(f, "{}", other),
        }
    }
}
