use crate::frontend::parser_error::{ParseError, ParseErrorKind, ParseErrors};
use crate::frontend::precedence::Precedence;
use crate::frontend::token::{Span, Token, TokenKind};
use crate::lang::node::{Expression, Statement};
use crate::lang::program::Program;

mod expressions;

/// Parses the expression starting at the current token.
pub(crate) type PrefixFn = fn(&mut Parser) -> Option<Expression>;

/// Continues an expression whose left operand is already parsed; the current
/// token is the operator.
pub(crate) type InfixFn = fn(&mut Parser, Expression) -> Option<Expression>;

/// Precedence-climbing parser for Quill.
///
/// The parser walks the token stream with a `cur`/`peek` pair. Every parse
/// function starts with `cur` on the first token of its construct and
/// returns with `cur` on the construct's last token.
///
/// Expressions are parsed through two fixed-size dispatch tables indexed by
/// [`TokenKind`], filled once in [`Parser::new`]: prefix parsers for tokens
/// that can start an expression and infix parsers for tokens that continue
/// one.
///
/// Errors never abort parsing. A failing parse function records a
/// [`ParseError`] and returns `None`; statement lists skip the statement and
/// resynchronize, so one pass reports as many errors as possible.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    prefixes: [Option<PrefixFn>; TokenKind::COUNT],
    infixes: [Option<InfixFn>; TokenKind::COUNT],
}

impl Parser {
    /// Creates a parser over lexer output. An `Eof` token is appended when
    /// the stream does not already end with one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().map(|t| t.is(TokenKind::Eof)).unwrap_or(false) {
            let span = tokens
                .last()
                .map(|t| t.span)
                .unwrap_or(Span { line: 1, col: 1 });
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            errors: Vec::new(),
            prefixes: [None; TokenKind::COUNT],
            infixes: [None; TokenKind::COUNT],
        };
        parser.register_parsers();
        parser
    }

    /// Errors recorded so far.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Parses the whole stream, failing if any syntax error was found.
    pub fn parse(&mut self) -> Result<Program, ParseErrors> {
        let program = self.parse_program();
        if self.errors.is_empty() {
            Ok(program)
        } else {
            Err(ParseErrors(self.errors.clone()))
        }
    }

    /// Parses the whole stream and returns every statement that parsed,
    /// even when errors were recorded.
    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.cur_is(TokenKind::Eof) {
            if self.cur_is(TokenKind::Semi) {
                self.next();
                continue;
            }

            match self.parse_statement() {
                Some(stmt) => {
                    statements.push(stmt);
                    self.next();
                }
                None => {
                    self.recover();
                    // A stray `}` has no enclosing block to end.
                    if self.cur_is(TokenKind::RBrace) {
                        self.next();
                    }
                }
            }
        }

        Program { statements }
    }

    // -------------------------------------------------------------------------
    // Token cursor
    // -------------------------------------------------------------------------

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn cur_is(&self, kind: TokenKind) -> bool {
        self.cur().is(kind)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().is(kind)
    }

    /// Advances by one token. The cursor never moves past `Eof`.
    fn next(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    /// Advances onto the next token if it is `kind`, otherwise records an
    /// error and leaves the cursor where it is.
    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.next();
            true
        } else {
            let found = self.peek().clone();
            self.error(
                ParseErrorKind::UnexpectedToken,
                &found,
                format!("expected {}, got {}", kind, found),
            );
            false
        }
    }

    /// Returns true if the next token that is not a statement terminator is
    /// `kind`, moving the cursor so that token becomes `peek`.
    ///
    /// Lets constructs such as `else` and match arms start on a new line.
    fn skip_terminators_before(&mut self, kind: TokenKind) -> bool {
        let last = self.tokens.len() - 1;
        let mut i = (self.pos + 1).min(last);
        while i < last && self.tokens[i].is(TokenKind::Semi) {
            i += 1;
        }
        if self.tokens[i].is(kind) {
            self.pos = i - 1;
            true
        } else {
            false
        }
    }

    /// Steps over line breaks so `peek` is the next real token. Used inside
    /// delimiters, where a newline never ends a statement.
    fn skip_newlines(&mut self) {
        while self.peek().is_newline() {
            self.next();
        }
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek().kind)
    }

    fn at_statement_end(&self) -> bool {
        self.peek_is(TokenKind::Semi) || self.peek_is(TokenKind::RBrace) || self.peek_is(TokenKind::Eof)
    }

    fn error(&mut self, kind: ParseErrorKind, token: &Token, message: impl Into<String>) {
        self.errors.push(ParseError::at(kind, token, message));
    }

    /// Skips the rest of a broken statement: stops on a `;`, on the `}` that
    /// closes the enclosing block, or at end of input. Braces opened inside
    /// the broken statement are skipped as a whole.
    fn recover(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.cur().kind {
                TokenKind::Eof => return,
                TokenKind::Semi | TokenKind::RBrace if depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            self.next();
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    /// Parses an expression, consuming infix operators for as long as they
    /// bind tighter than `precedence`.
    pub(crate) fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let Some(prefix) = self.prefixes[self.cur().kind as usize] else {
            let token = self.cur().clone();
            self.error(
                ParseErrorKind::UnexpectedToken,
                &token,
                format!("unexpected {} at start of expression", token),
            );
            return None;
        };

        let mut left = prefix(self)?;

        while !self.peek_is(TokenKind::Semi) && precedence < self.peek_precedence() {
            let Some(infix) = self.infixes[self.peek().kind as usize] else {
                return Some(left);
            };

            self.next();
            left = infix(self, left)?;
        }

        Some(left)
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    /// Parses one statement and checks that it is properly terminated.
    fn parse_statement(&mut self) -> Option<Statement> {
        let stmt = match self.cur().kind {
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => Some(Statement::Break {
                token: self.cur().clone(),
            }),
            TokenKind::Next => Some(Statement::Next {
                token: self.cur().clone(),
            }),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Export => self.parse_export(),
            TokenKind::Import => self.parse_import(),
            _ => self.parse_expression_statement(),
        }?;

        if !self.at_statement_end() {
            let found = self.peek().clone();
            self.error(
                ParseErrorKind::UnexpectedToken,
                &found,
                format!("expected end of statement, got {}", found),
            );
            return None;
        }

        Some(stmt)
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let token = self.cur().clone();
        let expr = self.parse_expression(Precedence::Lowest)?;
        Some(Statement::Expression { token, expr })
    }

    /// `return` or `return value`
    fn parse_return(&mut self) -> Option<Statement> {
        let token = self.cur().clone();

        if self.at_statement_end() {
            return Some(Statement::Return { token, value: None });
        }

        self.next();
        let value = self.parse_expression(Precedence::Lowest)?;
        Some(Statement::Return {
            token,
            value: Some(value),
        })
    }

    /// `while condition { body }`
    fn parse_while(&mut self) -> Option<Statement> {
        let token = self.cur().clone();
        self.next();

        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block()?;

        Some(Statement::While {
            token,
            condition,
            body,
        })
    }

    /// `for var in collection { body }`
    fn parse_for(&mut self) -> Option<Statement> {
        let token = self.cur().clone();
        self.next();

        let var = self.parse_expression(Precedence::Lowest)?;
        if !self.expect(TokenKind::In) {
            return None;
        }
        self.next();

        let collection = self.parse_expression(Precedence::Lowest)?;
        if !self.expect(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block()?;

        Some(Statement::For {
            token,
            var,
            collection,
            body,
        })
    }

    /// `export name` or `export a, b, c`
    fn parse_export(&mut self) -> Option<Statement> {
        let token = self.cur().clone();
        self.next();
        let names = self.parse_expression(Precedence::Lowest)?;
        Some(Statement::Export { token, names })
    }

    /// `import "path"`
    fn parse_import(&mut self) -> Option<Statement> {
        let token = self.cur().clone();
        if !self.expect(TokenKind::Str) {
            return None;
        }
        let path = self.cur().literal.clone();
        Some(Statement::Import { token, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> (Program, Vec<ParseError>) {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        let program = parser.parse_program();
        (program, parser.errors().to_vec())
    }

    fn parse_ok(source: &str) -> Program {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "unexpected errors for {:?}: {:?}", source, errors);
        program
    }

    /// Parses a single-statement source and renders it.
    fn render(source: &str) -> String {
        let program = parse_ok(source);
        assert_eq!(program.statements.len(), 1, "source: {:?}", source);
        program.statements[0].to_string()
    }

    fn single_expression(source: &str) -> Expression {
        match parse_ok(source).statements.remove(0) {
            Statement::Expression { expr, .. } => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    // =========================================================================
    // Precedence and associativity
    // =========================================================================

    #[test]
    fn test_product_binds_tighter_than_sum() {
        assert_eq!(render("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(render("1 * 2 + 3"), "((1 * 2) + 3)");
        assert_eq!(render("1 + 2 * 3"), render("1 + (2 * 3)"));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        assert_eq!(render("2 ^ 3 ^ 2"), "(2 ^ (3 ^ 2))");
        assert_eq!(render("2 ^ 3 ^ 2"), render("2 ^ (3 ^ 2)"));
        assert_eq!(render("a ^ b ^ c ^ d"), "(a ^ (b ^ (c ^ d)))");
    }

    #[test]
    fn test_left_associative_operators() {
        assert_eq!(render("1 - 2 - 3"), "((1 - 2) - 3)");
        assert_eq!(render("8 / 4 / 2"), "((8 / 4) / 2)");
        assert_eq!(render("a // b % c"), "((a // b) % c)");
        assert_eq!(render("a == b != c"), "((a == b) != c)");
    }

    #[test]
    fn test_logic_and_comparison_levels() {
        assert_eq!(render("a || b && c"), "(a || (b && c))");
        assert_eq!(render("a && b || c"), "((a && b) || c)");
        assert_eq!(render("a | b & c"), "(a | (b & c))");
        assert_eq!(render("a == b < c"), "(a == (b < c))");
        assert_eq!(render("a < b + 1"), "(a < (b + 1))");
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(render("-a + b"), "((-a) + b)");
        assert_eq!(render("--a"), "(-(-a))");
        assert_eq!(render("!a && b"), "((!a) && b)");
        assert_eq!(render("-a ^ 2"), "(-(a ^ 2))");
        assert_eq!(render("2 ^ -1"), "(2 ^ (-1))");
        assert_eq!(render("a + -b"), "(a + (-b))");
    }

    #[test]
    fn test_assignment_is_right_associative_and_loosest() {
        assert_eq!(render("a = b = 1"), "(a = (b = 1))");
        assert_eq!(render("x := 1 + 2"), "(x := (1 + 2))");
        assert_eq!(render("x := 1, 2"), "(x := (1, 2))");
    }

    #[test]
    fn test_comma_chain_is_left_nested() {
        assert_eq!(render("a, b, c"), "((a, b), c)");
    }

    #[test]
    fn test_postfix_operators() {
        assert_eq!(render("f(1, 2)(3)"), "f(1, 2)(3)");
        assert_eq!(render("xs[0][i + 1]"), "xs[0][(i + 1)]");
        assert_eq!(render("a.b.c"), "a.b.c");
        assert_eq!(render("a.b(c)"), "a.b(c)");
        assert_eq!(render("-f(x)"), "(-f(x))");
        assert_eq!(render("f()"), "f()");
    }

    #[test]
    fn test_operator_may_continue_on_next_line() {
        assert_eq!(render("1 +\n2"), "(1 + 2)");
    }

    // =========================================================================
    // Literals and collections
    // =========================================================================

    #[test]
    fn test_literals() {
        assert!(matches!(
            single_expression("42"),
            Expression::Number { value, .. } if value == 42.0
        ));
        assert!(matches!(
            single_expression("1_000.5"),
            Expression::Number { value, .. } if value == 1000.5
        ));
        assert!(matches!(
            single_expression("true"),
            Expression::Boolean { value: true, .. }
        ));
        assert!(matches!(single_expression("nil"), Expression::Nil { .. }));
        assert!(matches!(
            single_expression("\"hi\""),
            Expression::Str { value, .. } if value == "hi"
        ));
    }

    #[test]
    fn test_empty_parens_are_empty_tuple() {
        assert!(matches!(
            single_expression("()"),
            Expression::Tuple { elements, .. } if elements.is_empty()
        ));
    }

    #[test]
    fn test_single_parenthesized_expression_is_not_a_tuple() {
        assert!(matches!(
            single_expression("(1)"),
            Expression::Number { value, .. } if value == 1.0
        ));
        assert_eq!(render("(1 + 2) * 3"), "((1 + 2) * 3)");
    }

    #[test]
    fn test_parenthesized_comma_is_tuple() {
        match single_expression("(1, 2)") {
            Expression::Tuple { elements, .. } => assert_eq!(elements.len(), 2),
            other => panic!("expected tuple, got {:?}", other),
        }
        match single_expression("(a, b + 1, c)") {
            Expression::Tuple { elements, .. } => {
                let rendered: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                assert_eq!(rendered, vec!["a", "(b + 1)", "c"]);
            }
            other => panic!("expected tuple, got {:?}", other),
        }
        assert_eq!(render("(1,)"), "(1,)");
    }

    #[test]
    fn test_tuple_followed_by_operator() {
        // The closing paren is consumed exactly once.
        assert_eq!(render("(1, 2) + x"), "((1, 2) + x)");
    }

    #[test]
    fn test_lists() {
        assert!(matches!(
            single_expression("[]"),
            Expression::List { elements, .. } if elements.is_empty()
        ));
        assert_eq!(render("[1, 2 + 3]"), "[1, (2 + 3)]");
        assert_eq!(render("[1, 2,]"), "[1, 2]");
    }

    #[test]
    fn test_maps() {
        assert!(matches!(
            single_expression("map {}"),
            Expression::Map { pairs, .. } if pairs.is_empty()
        ));
        assert_eq!(render("map { \"a\": 1, b: 2 + 3 }"), "map { \"a\": 1, b: (2 + 3) }");
    }

    #[test]
    fn test_sets_are_lists() {
        assert!(matches!(
            single_expression("set {}"),
            Expression::List { elements, .. } if elements.is_empty()
        ));
        assert_eq!(render("set { 1, 2 }"), "[1, 2]");
    }

    #[test]
    fn test_map_requires_brace() {
        let (_, errors) = parse("map (1)");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected {"));
    }

    #[test]
    fn test_collections_may_span_lines() {
        assert_eq!(render("xs := [\n  1,\n  2\n]"), "(xs := [1, 2])");
        assert_eq!(render("[\n  1,\n  2,\n]"), "[1, 2]");
        assert_eq!(
            render("m := map {\n  \"a\": 1,\n  \"b\": 2\n}"),
            "(m := map { \"a\": 1, \"b\": 2 })"
        );
        assert_eq!(render("set {\n  1,\n  2\n}"), "[1, 2]");
        assert_eq!(render("f(\n  a,\n  b\n)"), "f(a, b)");
        assert_eq!(render("(\n  a,\n  b\n)"), "(a, b)");
        assert_eq!(render("(\n  a\n) + 1"), "(a + 1)");
        assert_eq!(render("xs[\n  i\n]"), "xs[i]");
    }

    #[test]
    fn test_semicolon_inside_list_is_still_an_error() {
        let (_, errors) = parse("[1; 2]");
        assert!(!errors.is_empty());
        assert!(errors[0].message.contains("expected ]"));
    }

    #[test]
    fn test_type_expression() {
        assert_eq!(render("type(a, b)"), "type(a, b)");
        assert_eq!(render("type()"), "type()");
        let (_, errors) = parse("type(1)");
        assert_eq!(errors.len(), 1);
    }

    // =========================================================================
    // Blocks, conditionals, match
    // =========================================================================

    #[test]
    fn test_block() {
        assert_eq!(render("{ x := 1; x + 1 }"), "{ (x := 1); (x + 1) }");
        assert_eq!(render("{\n  x := 1\n  x\n}"), "{ (x := 1); x }");
        assert_eq!(render("{}"), "{}");
    }

    #[test]
    fn test_if_expression() {
        assert_eq!(
            render("if x > 1 then 1 else { 2 }"),
            "if (x > 1) then 1 else { 2 }"
        );
        assert_eq!(render("if x then { y }"), "if x then { y }");
        assert_eq!(
            render("if a then { 1 }\nelse { 2 }"),
            "if a then { 1 } else { 2 }"
        );
    }

    #[test]
    fn test_else_requires_brace() {
        let (_, errors) = parse("if a then 1 else 2");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected {"));
    }

    #[test]
    fn test_if_requires_then() {
        let (_, errors) = parse("if a 1");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected then"));
    }

    #[test]
    fn test_match_expression() {
        assert_eq!(
            render("match x if 1 -> \"one\", if 2 -> \"two\""),
            "match x if 1 -> \"one\" if 2 -> \"two\""
        );
        assert_eq!(
            render("match true\n  if x < 0 -> -1\n  if x > 0 -> 1"),
            "match true if (x < 0) -> (-1) if (x > 0) -> 1"
        );
        assert_eq!(render("match x"), "match x");
    }

    #[test]
    fn test_match_branch_requires_arrow() {
        let (_, errors) = parse("match x if 1 then 2");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected ->"));
    }

    // =========================================================================
    // Statements
    // =========================================================================

    #[test]
    fn test_statements() {
        assert_eq!(render("return"), "return");
        assert_eq!(render("return x + 1"), "return (x + 1)");
        assert_eq!(render("while i < 10 { i = i + 1 }"), "while (i < 10) { (i = (i + 1)) }");
        assert_eq!(render("for x in xs { f(x) }"), "for x in xs { f(x) }");
        assert_eq!(render("export a, b"), "export (a, b)");
        assert_eq!(render("import \"lib/math\""), "import \"lib/math\"");
    }

    #[test]
    fn test_break_and_next_inside_loop_body() {
        assert_eq!(
            render("while true { break; next }"),
            "while true { break; next }"
        );
    }

    #[test]
    fn test_multiple_statements() {
        let program = parse_ok("x := 1\ny := 2; z := x + y\n\n");
        assert_eq!(program.statements.len(), 3);
    }

    #[test]
    fn test_missing_eof_is_appended() {
        let tokens = vec![Token::new(TokenKind::Ident, "x", Span { line: 1, col: 1 })];
        let mut parser = Parser::new(tokens);
        let program = parser.parse().unwrap();
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_dispatch_tables() {
        let parser = Parser::new(vec![]);
        assert!(parser.prefixes[TokenKind::Ident as usize].is_some());
        assert!(parser.prefixes[TokenKind::LParen as usize].is_some());
        assert!(parser.prefixes[TokenKind::RParen as usize].is_none());
        assert!(parser.infixes[TokenKind::Plus as usize].is_some());
        assert!(parser.infixes[TokenKind::LParen as usize].is_some());
        assert!(parser.infixes[TokenKind::Bang as usize].is_none());
    }

    // =========================================================================
    // Errors and recovery
    // =========================================================================

    #[test]
    fn test_no_prefix_parser_is_unexpected_token() {
        let (program, errors) = parse(")");
        assert!(program.statements.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::UnexpectedToken);
        assert_eq!((errors[0].line, errors[0].col), (1, 1));
    }

    #[test]
    fn test_invalid_number_continues_with_nil() {
        let (program, errors) = parse("x := 1.2.3\ny := 2");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::InvalidNumber);
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[0].to_string(), "(x := nil)");
    }

    #[test]
    fn test_block_skips_malformed_statement() {
        let (program, errors) = parse("{\n  a := 1\n  b := )\n  c := 3\n}");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::UnexpectedToken);
        assert_eq!(errors[0].line, 3);
        assert_eq!(program.statements.len(), 1);
        assert_eq!(program.statements[0].to_string(), "{ (a := 1); (c := 3) }");
    }

    #[test]
    fn test_errors_are_collected_in_one_pass() {
        let (program, errors) = parse("x := )\ny := 1\nz := ]");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].line, 3);
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_recovery_skips_nested_braces() {
        let (program, errors) = parse("{ a := 1 2 { b }; c }");
        assert_eq!(errors.len(), 1);
        assert_eq!(program.statements[0].to_string(), "{ c }");
    }

    #[test]
    fn test_missing_statement_separator() {
        let (_, errors) = parse("1 2");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected end of statement"));
    }

    #[test]
    fn test_unclosed_block() {
        let (_, errors) = parse("{ 1");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected }"));
    }

    #[test]
    fn test_stray_closing_brace() {
        let (program, errors) = parse("}\nx");
        assert_eq!(errors.len(), 1);
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_unclosed_tuple() {
        let (_, errors) = parse("(1, 2");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected )"));
    }

    #[test]
    fn test_parse_fails_on_any_error() {
        let tokens = Lexer::new("x := )").tokenize().unwrap();
        let err = Parser::new(tokens).parse().unwrap_err();
        assert_eq!(err.0.len(), 1);
        assert!(err.to_string().starts_with("1:6:"));
    }
}
