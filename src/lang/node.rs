use crate::frontend::token::{Token, TokenKind};

/// A statement. Statements are the unit the block and program builders
/// collect; only expression statements produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// An expression evaluated for its value or side effects.
    Expression { token: Token, expr: Expression },

    /// `return [value]`
    Return {
        token: Token,
        value: Option<Expression>,
    },

    /// `break`: leave the innermost loop.
    Break { token: Token },

    /// `next`: start the innermost loop's next iteration.
    Next { token: Token },

    /// `while condition { body }`
    While {
        token: Token,
        condition: Expression,
        body: Expression,
    },

    /// `for var in collection { body }`
    ///
    /// `var` is kept as a full expression so the compiler can reject
    /// anything other than a plain identifier with a precise error.
    For {
        token: Token,
        var: Expression,
        collection: Expression,
        body: Expression,
    },

    /// `export a` or `export a, b, c`
    Export { token: Token, names: Expression },

    /// `import "path"`
    Import { token: Token, path: String },
}

impl Statement {
    pub fn token(&self) -> &Token {
        match self {
            Statement::Expression { token, .. }
            | Statement::Return { token, .. }
            | Statement::Break { token }
            | Statement::Next { token }
            | Statement::While { token, .. }
            | Statement::For { token, .. }
            | Statement::Export { token, .. }
            | Statement::Import { token, .. } => token,
        }
    }

    /// Short human-readable name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Expression { .. } => "expression statement",
            Statement::Return { .. } => "return",
            Statement::Break { .. } => "break",
            Statement::Next { .. } => "next",
            Statement::While { .. } => "while",
            Statement::For { .. } => "for",
            Statement::Export { .. } => "export",
            Statement::Import { .. } => "import",
        }
    }
}

/// One `if condition -> body` arm of a match expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchBranch {
    pub condition: Expression,
    pub body: Expression,
}

/// An expression. Every variant carries the token it started at (for
/// binary operators: the operator token) so errors can point at source.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier {
        token: Token,
        name: String,
    },
    Number {
        token: Token,
        value: f64,
    },
    Boolean {
        token: Token,
        value: bool,
    },
    Nil {
        token: Token,
    },
    Str {
        token: Token,
        value: String,
    },
    Tuple {
        token: Token,
        elements: Vec<Expression>,
    },
    /// List literal, also used for `set { ... }`.
    List {
        token: Token,
        elements: Vec<Expression>,
    },
    Map {
        token: Token,
        pairs: Vec<(Expression, Expression)>,
    },
    Block {
        token: Token,
        statements: Vec<Statement>,
    },
    /// Unary operator; the operator is `token.kind`.
    Prefix {
        token: Token,
        right: Box<Expression>,
    },
    /// Binary operator, including `=`, `:=`, `,` and `.`; the operator is
    /// `token.kind`.
    Infix {
        token: Token,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Index {
        token: Token,
        left: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        token: Token,
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    If {
        token: Token,
        condition: Box<Expression>,
        consequence: Box<Expression>,
        alternative: Option<Box<Expression>>,
    },
    Match {
        token: Token,
        input: Box<Expression>,
        branches: Vec<MatchBranch>,
    },
    /// `type(a, b)`
    Type {
        token: Token,
        parameters: Vec<String>,
    },
}

impl Expression {
    pub fn token(&self) -> &Token {
        match self {
            Expression::Identifier { token, .. }
            | Expression::Number { token, .. }
            | Expression::Boolean { token, .. }
            | Expression::Nil { token }
            | Expression::Str { token, .. }
            | Expression::Tuple { token, .. }
            | Expression::List { token, .. }
            | Expression::Map { token, .. }
            | Expression::Block { token, .. }
            | Expression::Prefix { token, .. }
            | Expression::Infix { token, .. }
            | Expression::Index { token, .. }
            | Expression::Call { token, .. }
            | Expression::If { token, .. }
            | Expression::Match { token, .. }
            | Expression::Type { token, .. } => token,
        }
    }

    /// Flattens a left-nested comma chain `a, b, c` into `[a, b, c]`.
    ///
    /// Any other expression is returned as a single-element list.
    pub fn comma_elements(&self) -> Vec<&Expression> {
        match self {
            Expression::Infix { token, left, right } if token.kind == TokenKind::Comma => {
                let mut elements = left.comma_elements();
                elements.extend(right.comma_elements());
                elements
            }
            other => vec![other],
        }
    }
}

fn write_list(f: &mut std::fmt::Formatter<'_>, items: &[Expression]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Fully parenthesized rendering, so operator nesting is explicit.
impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Identifier { name, .. } => write!(f, "{}", name),
            Expression::Number { value, .. } => write!(f, "{}", value),
            Expression::Boolean { value, .. } => write!(f, "{}", value),
            Expression::Nil { .. } => write!(f, "nil"),
            Expression::Str { value, .. } => write!(f, "{:?}", value),
            Expression::Tuple { elements, .. } => {
                write!(f, "(")?;
                write_list(f, elements)?;
                if elements.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Expression::List { elements, .. } => {
                write!(f, "[")?;
                write_list(f, elements)?;
                write!(f, "]")
            }
            Expression::Map { pairs, .. } => {
                write!(f, "map {{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", key, value)?;
                }
                if !pairs.is_empty() {
                    write!(f, " ")?;
                }
                write!(f, "}}")
            }
            Expression::Block { statements, .. } => {
                write!(f, "{{")?;
                for (i, stmt) in statements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    write!(f, " {}", stmt)?;
                }
                if !statements.is_empty() {
                    write!(f, " ")?;
                }
                write!(f, "}}")
            }
            Expression::Prefix { token, right } => write!(f, "({}{})", token.kind, right),
            Expression::Infix { token, left, right } => match token.kind {
                TokenKind::Dot => write!(f, "{}.{}", left, right),
                TokenKind::Comma => write!(f, "({}, {})", left, right),
                kind => write!(f, "({} {} {})", left, kind, right),
            },
            Expression::Index { left, index, .. } => write!(f, "{}[{}]", left, index),
            Expression::Call {
                function,
                arguments,
                ..
            } => {
                write!(f, "{}(", function)?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "if {} then {}", condition, consequence)?;
                if let Some(alt) = alternative {
                    write!(f, " else {}", alt)?;
                }
                Ok(())
            }
            Expression::Match {
                input, branches, ..
            } => {
                write!(f, "match {}", input)?;
                for branch in branches {
                    write!(f, " if {} -> {}", branch.condition, branch.body)?;
                }
                Ok(())
            }
            Expression::Type { parameters, .. } => write!(f, "type({})", parameters.join(", ")),
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Expression { expr, .. } => write!(f, "{}", expr),
            Statement::Return { value: None, .. } => write!(f, "return"),
            Statement::Return {
                value: Some(value), ..
            } => write!(f, "return {}", value),
            Statement::Break { .. } => write!(f, "break"),
            Statement::Next { .. } => write!(f, "next"),
            Statement::While {
                condition, body, ..
            } => write!(f, "while {} {}", condition, body),
            Statement::For {
                var,
                collection,
                body,
                ..
            } => write!(f, "for {} in {} {}", var, collection, body),
            Statement::Export { names, .. } => write!(f, "export {}", names),
            Statement::Import { path, .. } => write!(f, "import {:?}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::token::Span;

    fn tok(kind: TokenKind, literal: &str) -> Token {
        Token::new(kind, literal, Span { line: 1, col: 1 })
    }

    fn ident(name: &str) -> Expression {
        Expression::Identifier {
            token: tok(TokenKind::Ident, name),
            name: name.to_string(),
        }
    }

    fn comma(left: Expression, right: Expression) -> Expression {
        Expression::Infix {
            token: tok(TokenKind::Comma, ","),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn test_comma_elements_flattens_in_order() {
        let chain = comma(comma(ident("a"), ident("b")), ident("c"));
        let names: Vec<String> = chain.comma_elements().iter().map(|e| e.to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_comma_elements_single() {
        let single = ident("a");
        assert_eq!(single.comma_elements().len(), 1);
    }

    #[test]
    fn test_display_tuple_forms() {
        let token = tok(TokenKind::LParen, "(");
        let empty = Expression::Tuple {
            token: token.clone(),
            elements: vec![],
        };
        let one = Expression::Tuple {
            token,
            elements: vec![ident("a")],
        };
        assert_eq!(empty.to_string(), "()");
        assert_eq!(one.to_string(), "(a,)");
    }

    #[test]
    fn test_statement_kind_name() {
        let stmt = Statement::Break {
            token: tok(TokenKind::Break, "break"),
        };
        assert_eq!(stmt.kind_name(), "break");
        assert_eq!(stmt.token().kind, TokenKind::Break);
    }
}
