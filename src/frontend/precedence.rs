use crate::frontend::token::TokenKind;

/// Binding power of an operator, weakest first.
///
/// The parser keeps consuming infix operators while the next operator binds
/// tighter than the current minimum, so equal precedence stops the loop and
/// yields left associativity. Right-associative operators parse their right
/// operand at [`Precedence::one_less`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Assign,
    Comma,
    LogicOr,
    LogicAnd,
    BitOr,
    BitAnd,
    Equality,
    Compare,
    Sum,
    Product,
    Prefix,
    Exponent,
    Postfix,
}

impl Precedence {
    /// Infix binding power of a token; `Lowest` for tokens with no infix role.
    pub fn of(kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::Assign | TokenKind::Declare => Precedence::Assign,
            TokenKind::Comma => Precedence::Comma,
            TokenKind::Or => Precedence::LogicOr,
            TokenKind::And => Precedence::LogicAnd,
            TokenKind::BitOr => Precedence::BitOr,
            TokenKind::BitAnd => Precedence::BitAnd,
            TokenKind::Eq | TokenKind::NotEq => Precedence::Equality,
            TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => {
                Precedence::Compare
            }
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Star | TokenKind::Slash | TokenKind::FloorDiv | TokenKind::Percent => {
                Precedence::Product
            }
            TokenKind::Caret => Precedence::Exponent,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot => Precedence::Postfix,
            _ => Precedence::Lowest,
        }
    }

    /// Operators whose right operand re-enters at their own level.
    pub fn is_right_associative(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Caret | TokenKind::Assign | TokenKind::Declare
        )
    }

    /// The precedence a binary operator's right operand is parsed at.
    pub fn right_operand(kind: TokenKind) -> Precedence {
        let own = Precedence::of(kind);
        if Precedence::is_right_associative(kind) {
            own.one_less()
        } else {
            own
        }
    }

    pub fn one_less(self) -> Precedence {
        match self {
            Precedence::Lowest | Precedence::Assign => Precedence::Lowest,
            Precedence::Comma => Precedence::Assign,
            Precedence::LogicOr => Precedence::Comma,
            Precedence::LogicAnd => Precedence::LogicOr,
            Precedence::BitOr => Precedence::LogicAnd,
            Precedence::BitAnd => Precedence::BitOr,
            Precedence::Equality => Precedence::BitAnd,
            Precedence::Compare => Precedence::Equality,
            Precedence::Sum => Precedence::Compare,
            Precedence::Product => Precedence::Sum,
            Precedence::Prefix => Precedence::Product,
            Precedence::Exponent => Precedence::Prefix,
            Precedence::Postfix => Precedence::Exponent,
        }
    }
}
