use crate::frontend::token::{Span, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{line}:{col}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

/// Turns source text into a flat token stream terminated by `Eof`.
///
/// Newlines are significant only as statement terminators: a newline becomes
/// a `Semi` token when the token before it can end an expression (see
/// [`TokenKind::ends_statement`]). Everything else on a line break is
/// whitespace, so binary operators may continue onto the next line.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> LexerError {
        LexerError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_string(&mut self, start: Span) -> Result<Token, LexerError> {
        self.advance();

        let mut string = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::new(TokenKind::Str, string, start));
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => string.push('\n'),
                        Some('t') => string.push('\t'),
                        Some('r') => string.push('\r'),
                        Some('\\') => string.push('\\'),
                        Some('"') => string.push('"'),
                        Some('0') => string.push('\0'),
                        Some(ch) => {
                            return Err(
                                self.error(format!("unknown escape sequence: \\{}", ch), self.span())
                            );
                        }
                        None => {
                            return Err(self.error("unexpected EOF in escape sequence", self.span()));
                        }
                    }
                    self.advance();
                }
                Some('\n') => {
                    return Err(
                        self.error("unterminated string (newline before closing quote)", start)
                    );
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => return Err(self.error("unterminated string literal", start)),
            }
        }
    }

    /// Reads a number-shaped lexeme without validating it.
    ///
    /// The literal text is kept verbatim so the parser can report malformed
    /// numbers (`1.2.3`, `12ab`) as `InvalidNumber` and keep going.
    fn read_number(&mut self, start: Span) -> Token {
        let mut digits = String::new();
        while let Some(ch) = self.current() {
            let is_fraction_dot =
                ch == '.' && self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false);
            if ch.is_ascii_alphanumeric() || ch == '_' || is_fraction_dot {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Number, digits, start)
    }

    fn read_identifier(&mut self, start: Span) -> Token {
        let mut ident = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match TokenKind::keyword(&ident) {
            Some(kind) => Token::new(kind, ident, start),
            None => Token::new(TokenKind::Ident, ident, start),
        }
    }

    fn read_operator(&mut self) -> Option<(TokenKind, usize)> {
        let ch = self.current()?;
        let next = self.peek();

        let op = match (ch, next) {
            ('/', Some('/')) => (TokenKind::FloorDiv, 2),
            ('=', Some('=')) => (TokenKind::Eq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('&', Some('&')) => (TokenKind::And, 2),
            ('|', Some('|')) => (TokenKind::Or, 2),
            (':', Some('=')) => (TokenKind::Declare, 2),
            ('-', Some('>')) => (TokenKind::Arrow, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('^', _) => (TokenKind::Caret, 1),
            ('!', _) => (TokenKind::Bang, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('&', _) => (TokenKind::BitAnd, 1),
            ('|', _) => (TokenKind::BitOr, 1),
            ('=', _) => (TokenKind::Assign, 1),
            (':', _) => (TokenKind::Colon, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('.', _) => (TokenKind::Dot, 1),
            (';', _) => (TokenKind::Semi, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            _ => return None,
        };

        Some(op)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens: Vec<Token> = Vec::new();

        loop {
            self.skip_whitespace();
            let span = self.span();

            match self.current() {
                None => {
                    tokens.push(Token::new(TokenKind::Eof, "", span));
                    break;
                }
                Some('\n') => {
                    self.advance();
                    let terminates = tokens
                        .last()
                        .map(|t| t.kind.ends_statement())
                        .unwrap_or(false);
                    if terminates {
                        tokens.push(Token::new(TokenKind::Semi, "\n", span));
                    }
                }
                Some('#') => self.skip_comment(),
                Some('"') => tokens.push(self.read_string(span)?),
                Some(ch) if ch.is_ascii_digit() => tokens.push(self.read_number(span)),
                Some(ch) if ch.is_alphabetic() || ch == '_' => {
                    tokens.push(self.read_identifier(span))
                }
                Some(ch) => match self.read_operator() {
                    Some((kind, width)) => {
                        let literal: String = self.source[self.pos..self.pos + width].iter().collect();
                        for _ in 0..width {
                            self.advance();
                        }
                        tokens.push(Token::new(kind, literal, span));
                    }
                    None => {
                        return Err(self.error(format!("unexpected character: '{}'", ch), span));
                    }
                },
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    fn literals(source: &str) -> Vec<String> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.literal)
            .collect()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            kinds("1 + 2 * 3 ^ 4 // 5 % 6 - 7 / 8"),
            vec![
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Star,
                TokenKind::Number,
                TokenKind::Caret,
                TokenKind::Number,
                TokenKind::FloorDiv,
                TokenKind::Number,
                TokenKind::Percent,
                TokenKind::Number,
                TokenKind::Minus,
                TokenKind::Number,
                TokenKind::Slash,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(
            kinds("== != < > <= >= && || & | !"),
            vec![
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::BitAnd,
                TokenKind::BitOr,
                TokenKind::Bang,
            ]
        );
    }

    #[test]
    fn test_binding_and_punctuation() {
        assert_eq!(
            kinds("x := 1; y = x, z: w.v -> q"),
            vec![
                TokenKind::Ident,
                TokenKind::Declare,
                TokenKind::Number,
                TokenKind::Semi,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn test_keywords_vs_identifiers() {
        assert_eq!(
            kinds("while whiles for in input match map mapping"),
            vec![
                TokenKind::While,
                TokenKind::Ident,
                TokenKind::For,
                TokenKind::In,
                TokenKind::Ident,
                TokenKind::Match,
                TokenKind::Map,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn test_numbers_keep_literal_text() {
        assert_eq!(literals("42 3.25 1_000 1.2.3 12ab"), vec![
            "42", "3.25", "1_000", "1.2.3", "12ab"
        ]);
    }

    #[test]
    fn test_number_followed_by_member_access() {
        // A dot not followed by a digit ends the number.
        assert_eq!(
            kinds("1.abs"),
            vec![TokenKind::Number, TokenKind::Dot, TokenKind::Ident]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(literals(r#""a\n\t\"b\\""#), vec!["a\n\t\"b\\"]);
    }

    #[test]
    fn test_unterminated_string_error() {
        let err = Lexer::new("\"abc\nx").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated"));
        assert_eq!((err.line, err.col), (1, 1));
    }

    #[test]
    fn test_unknown_escape_error() {
        let err = Lexer::new(r#""\q""#).tokenize().unwrap_err();
        assert!(err.message.contains("unknown escape"));
    }

    #[test]
    fn test_unexpected_character_error() {
        let err = Lexer::new("x = @").tokenize().unwrap_err();
        assert!(err.to_string().contains("unexpected character: '@'"));
        assert_eq!((err.line, err.col), (1, 5));
    }

    #[test]
    fn test_newline_inserts_semi_after_expression_end() {
        assert_eq!(
            kinds("x\ny"),
            vec![TokenKind::Ident, TokenKind::Semi, TokenKind::Ident]
        );
        assert_eq!(
            kinds("f(1)\n[2]\n{}\n"),
            vec![
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Number,
                TokenKind::RParen,
                TokenKind::Semi,
                TokenKind::LBracket,
                TokenKind::Number,
                TokenKind::RBracket,
                TokenKind::Semi,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Semi,
            ]
        );
    }

    #[test]
    fn test_newline_after_operator_continues_expression() {
        assert_eq!(
            kinds("1 +\n2"),
            vec![TokenKind::Number, TokenKind::Plus, TokenKind::Number]
        );
        assert_eq!(
            kinds("while x {\ny\n}"),
            vec![
                TokenKind::While,
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::Ident,
                TokenKind::Semi,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("x # the answer\n# whole line\ny"),
            vec![TokenKind::Ident, TokenKind::Semi, TokenKind::Ident]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::new("x := 10\n  y").tokenize().unwrap();
        let spans: Vec<(usize, usize)> = tokens.iter().map(|t| (t.span.line, t.span.col)).collect();
        assert_eq!(spans, vec![(1, 1), (1, 3), (1, 6), (1, 8), (2, 3), (2, 4)]);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_empty_source_is_just_eof() {
        let tokens = Lexer::new("").tokenize().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }
}
