use super::{InfixFn, Parser, PrefixFn};
use crate::frontend::parser_error::ParseErrorKind;
use crate::frontend::precedence::Precedence;
use crate::frontend::token::TokenKind;
use crate::lang::node::{Expression, MatchBranch};

impl Parser {
    /// Fills the prefix and infix dispatch tables.
    pub(super) fn register_parsers(&mut self) {
        self.register_prefix(TokenKind::Ident, Parser::parse_identifier);
        self.register_prefix(TokenKind::Number, Parser::parse_number);
        self.register_prefix(TokenKind::Str, Parser::parse_string);
        self.register_prefix(TokenKind::True, Parser::parse_boolean);
        self.register_prefix(TokenKind::False, Parser::parse_boolean);
        self.register_prefix(TokenKind::Nil, Parser::parse_nil);
        self.register_prefix(TokenKind::Minus, Parser::parse_prefix);
        self.register_prefix(TokenKind::Bang, Parser::parse_prefix);
        self.register_prefix(TokenKind::LParen, Parser::parse_grouped);
        self.register_prefix(TokenKind::LBracket, Parser::parse_list);
        self.register_prefix(TokenKind::LBrace, Parser::parse_block);
        self.register_prefix(TokenKind::Map, Parser::parse_map);
        self.register_prefix(TokenKind::Set, Parser::parse_set);
        self.register_prefix(TokenKind::If, Parser::parse_if);
        self.register_prefix(TokenKind::Match, Parser::parse_match);
        self.register_prefix(TokenKind::Type, Parser::parse_type);

        for kind in [
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::FloorDiv,
            TokenKind::Percent,
            TokenKind::Caret,
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
            TokenKind::Assign,
            TokenKind::Declare,
            TokenKind::Comma,
            TokenKind::Dot,
        ] {
            self.register_infix(kind, Parser::parse_infix);
        }
        self.register_infix(TokenKind::LParen, Parser::parse_call);
        self.register_infix(TokenKind::LBracket, Parser::parse_index);
    }

    fn register_prefix(&mut self, kind: TokenKind, f: PrefixFn) {
        self.prefixes[kind as usize] = Some(f);
    }

    fn register_infix(&mut self, kind: TokenKind, f: InfixFn) {
        self.infixes[kind as usize] = Some(f);
    }

    // -------------------------------------------------------------------------
    // Prefix parsers
    // -------------------------------------------------------------------------

    fn parse_identifier(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        let name = token.literal.clone();
        Some(Expression::Identifier { token, name })
    }

    /// Number literals keep their source text in the lexer; `_` separators
    /// are dropped here. A literal that does not convert is reported and
    /// replaced by `nil` so parsing can go on.
    fn parse_number(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        match token.literal.replace('_', "").parse::<f64>() {
            Ok(value) => Some(Expression::Number { token, value }),
            Err(_) => {
                self.error(
                    ParseErrorKind::InvalidNumber,
                    &token,
                    format!("could not parse {:?} as a number", token.literal),
                );
                Some(Expression::Nil { token })
            }
        }
    }

    fn parse_string(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        let value = token.literal.clone();
        Some(Expression::Str { token, value })
    }

    fn parse_boolean(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        let value = token.is(TokenKind::True);
        Some(Expression::Boolean { token, value })
    }

    fn parse_nil(&mut self) -> Option<Expression> {
        Some(Expression::Nil {
            token: self.cur().clone(),
        })
    }

    /// `-x`, `!x`
    fn parse_prefix(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        self.next();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix {
            token,
            right: Box::new(right),
        })
    }

    /// `()` is the empty tuple, `(x)` is just `x`, and `(x,)` or `(x, y)`
    /// build a tuple.
    fn parse_grouped(&mut self) -> Option<Expression> {
        let token = self.cur().clone();

        if self.peek_is(TokenKind::RParen) {
            self.next();
            return Some(Expression::Tuple {
                token,
                elements: Vec::new(),
            });
        }

        self.skip_newlines();
        self.next();
        let first = self.parse_expression(Precedence::Comma)?;

        self.skip_newlines();
        if !self.peek_is(TokenKind::Comma) {
            if !self.expect(TokenKind::RParen) {
                return None;
            }
            return Some(first);
        }

        let mut elements = vec![first];
        while self.peek_is(TokenKind::Comma) {
            self.next();
            self.skip_newlines();
            if self.peek_is(TokenKind::RParen) {
                break;
            }
            self.next();
            elements.push(self.parse_expression(Precedence::Comma)?);
            self.skip_newlines();
        }
        if !self.expect(TokenKind::RParen) {
            return None;
        }

        Some(Expression::Tuple { token, elements })
    }

    /// `[a, b, c]`
    fn parse_list(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        if self.peek_is(TokenKind::RBracket) {
            self.next();
            return Some(Expression::List {
                token,
                elements: Vec::new(),
            });
        }
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expression::List { token, elements })
    }

    /// `map { key: value, ... }`
    fn parse_map(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        if !self.expect(TokenKind::LBrace) {
            return None;
        }

        let mut pairs = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek_is(TokenKind::RBrace) {
                break;
            }
            self.next();
            let key = self.parse_expression(Precedence::Comma)?;
            if !self.expect(TokenKind::Colon) {
                return None;
            }
            self.next();
            let value = self.parse_expression(Precedence::Comma)?;
            pairs.push((key, value));

            self.skip_newlines();
            if !self.peek_is(TokenKind::Comma) {
                break;
            }
            self.next();
        }
        if !self.expect(TokenKind::RBrace) {
            return None;
        }

        Some(Expression::Map { token, pairs })
    }

    /// `set { a, b }` has no dedicated node; it builds a list.
    fn parse_set(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        if !self.expect(TokenKind::LBrace) {
            return None;
        }
        let elements = self.parse_expression_list(TokenKind::RBrace)?;
        Some(Expression::List { token, elements })
    }

    /// `{ statements }`. Broken statements inside the block are skipped after
    /// their error is recorded. A block cut off by end of input is still
    /// returned.
    pub(super) fn parse_block(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        self.next();

        let mut statements = Vec::new();
        while !self.cur_is(TokenKind::RBrace) && !self.cur_is(TokenKind::Eof) {
            if self.cur_is(TokenKind::Semi) {
                self.next();
                continue;
            }
            match self.parse_statement() {
                Some(stmt) => {
                    statements.push(stmt);
                    self.next();
                }
                None => self.recover(),
            }
        }

        if self.cur_is(TokenKind::Eof) {
            let eof = self.cur().clone();
            self.error(
                ParseErrorKind::UnexpectedToken,
                &eof,
                format!("expected }}, got {}", eof),
            );
        }

        Some(Expression::Block { token, statements })
    }

    /// `if cond then expr [else { ... }]`
    ///
    /// The `else` may sit on a following line.
    fn parse_if(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        self.next();

        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect(TokenKind::Then) {
            return None;
        }
        self.next();
        let consequence = self.parse_expression(Precedence::Lowest)?;

        let mut alternative = None;
        if self.skip_terminators_before(TokenKind::Else) {
            self.next();
            if !self.expect(TokenKind::LBrace) {
                return None;
            }
            alternative = Some(Box::new(self.parse_block()?));
        }

        Some(Expression::If {
            token,
            condition: Box::new(condition),
            consequence: Box::new(consequence),
            alternative,
        })
    }

    /// `match input if cond -> body [,] if cond -> body ...`
    ///
    /// Arms continue while the next token past any terminators is `if`.
    /// Bodies stop at a comma so arms can be comma separated.
    fn parse_match(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        self.next();
        let input = self.parse_expression(Precedence::Lowest)?;

        let mut branches = Vec::new();
        loop {
            let before_separator = self.pos;
            if self.peek_is(TokenKind::Comma) {
                self.next();
            }
            if !self.skip_terminators_before(TokenKind::If) {
                // A trailing comma that does not lead into another arm
                // belongs to the enclosing expression.
                self.pos = before_separator;
                break;
            }
            self.next();
            self.next();

            let condition = self.parse_expression(Precedence::Lowest)?;
            if !self.expect(TokenKind::Arrow) {
                return None;
            }
            self.next();
            let body = self.parse_expression(Precedence::Comma)?;
            branches.push(MatchBranch { condition, body });
        }

        Some(Expression::Match {
            token,
            input: Box::new(input),
            branches,
        })
    }

    /// `type(a, b)`: parameters are bare identifiers.
    fn parse_type(&mut self) -> Option<Expression> {
        let token = self.cur().clone();
        if !self.expect(TokenKind::LParen) {
            return None;
        }

        let mut parameters = Vec::new();
        if self.peek_is(TokenKind::RParen) {
            self.next();
            return Some(Expression::Type { token, parameters });
        }

        loop {
            self.next();
            if !self.cur_is(TokenKind::Ident) {
                let found = self.cur().clone();
                self.error(
                    ParseErrorKind::UnexpectedToken,
                    &found,
                    format!("expected type parameter name, got {}", found),
                );
                return None;
            }
            parameters.push(self.cur().literal.clone());

            if self.peek_is(TokenKind::Comma) {
                self.next();
                continue;
            }
            if !self.expect(TokenKind::RParen) {
                return None;
            }
            break;
        }

        Some(Expression::Type { token, parameters })
    }

    // -------------------------------------------------------------------------
    // Infix parsers
    // -------------------------------------------------------------------------

    /// Binary operators, assignment, `,` and `.`.
    fn parse_infix(&mut self, left: Expression) -> Option<Expression> {
        let token = self.cur().clone();
        let precedence = Precedence::right_operand(token.kind);
        self.next();
        let right = self.parse_expression(precedence)?;
        Some(Expression::Infix {
            token,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// `f(args)`
    fn parse_call(&mut self, function: Expression) -> Option<Expression> {
        let token = self.cur().clone();
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expression::Call {
            token,
            function: Box::new(function),
            arguments,
        })
    }

    /// `xs[index]`
    fn parse_index(&mut self, left: Expression) -> Option<Expression> {
        let token = self.cur().clone();
        self.next();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.skip_newlines();
        if !self.expect(TokenKind::RBracket) {
            return None;
        }
        Some(Expression::Index {
            token,
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    /// Comma-separated expressions up to `end`, with an optional trailing
    /// comma and line breaks anywhere between elements. Starts on the opening
    /// delimiter and ends on `end`.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut list = Vec::new();

        loop {
            self.skip_newlines();
            if self.peek_is(end) {
                break;
            }
            self.next();
            list.push(self.parse_expression(Precedence::Comma)?);
            self.skip_newlines();
            if !self.peek_is(TokenKind::Comma) {
                break;
            }
            self.next();
        }
        if !self.expect(end) {
            return None;
        }

        Some(list)
    }
}
