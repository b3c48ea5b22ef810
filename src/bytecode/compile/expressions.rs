use super::Compiler;
use crate::{
    bytecode::{compile_error::CompileError, op::Opcode},
    frontend::token::{Token, TokenKind},
    lang::{
        node::{Expression, MatchBranch, Statement},
        value::Value,
    },
};

/// Opcode for a binary operator token.
fn binary_opcode(kind: TokenKind) -> Option<Opcode> {
    let op = match kind {
        TokenKind::Plus => Opcode::BinaryAdd,
        TokenKind::Minus => Opcode::BinarySub,
        TokenKind::Star => Opcode::BinaryMul,
        TokenKind::Slash => Opcode::BinaryDiv,
        TokenKind::Caret => Opcode::BinaryExp,
        TokenKind::FloorDiv => Opcode::BinaryFloorDiv,
        TokenKind::Percent => Opcode::BinaryMod,
        TokenKind::Or => Opcode::BinaryLogicOr,
        TokenKind::And => Opcode::BinaryLogicAnd,
        TokenKind::BitOr => Opcode::BinaryBitOr,
        TokenKind::BitAnd => Opcode::BinaryBitAnd,
        TokenKind::Eq => Opcode::BinaryEqual,
        TokenKind::NotEq => Opcode::BinaryNotEqual,
        TokenKind::Lt => Opcode::BinaryLess,
        TokenKind::Gt => Opcode::BinaryMore,
        TokenKind::LtEq => Opcode::BinaryLessEq,
        TokenKind::GtEq => Opcode::BinaryMoreEq,
        _ => return None,
    };
    Some(op)
}

/// The name on the right of `.`, which must be a bare identifier.
fn member_name(member: &Expression) -> Result<&str, CompileError> {
    match member {
        Expression::Identifier { name, .. } => Ok(name.as_str()),
        other => Err(CompileError::invalid_member(other.token(), other)),
    }
}

impl Compiler {
    /// Compiles `expr` so that it leaves exactly one value on the stack.
    pub fn compile_expression(&mut self, expr: &Expression) -> Result<(), CompileError> {
        match expr {
            Expression::Identifier { name, .. } => {
                let idx = self.add_name(name)?;
                self.emit_u16(Opcode::LoadName, idx);
                Ok(())
            }
            Expression::Number { value, .. } => self.emit_constant(Value::Number(*value)),
            Expression::Boolean { value, .. } => self.emit_constant(Value::Bool(*value)),
            Expression::Nil { .. } => self.emit_constant(Value::Nil),
            Expression::Str { value, .. } => self.emit_constant(Value::Str(value.clone())),
            Expression::Type { parameters, .. } => {
                self.emit_constant(Value::Type(parameters.clone()))
            }

            Expression::Tuple { token, elements } => {
                self.compile_sequence(Opcode::MakeTuple, token, elements.iter())
            }
            Expression::List { token, elements } => {
                self.compile_sequence(Opcode::MakeList, token, elements.iter())
            }
            Expression::Map { token, pairs } => {
                for (key, value) in pairs {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit_count(Opcode::MakeMap, token, pairs.len())
            }

            Expression::Block { statements, .. } => self.compile_block(statements),

            Expression::Prefix { token, right } => {
                let op = match token.kind {
                    TokenKind::Minus => Opcode::UnaryNegate,
                    TokenKind::Bang => Opcode::UnaryInvert,
                    _ => return Err(CompileError::unsupported_operator(token)),
                };
                self.compile_expression(right)?;
                self.emit(op);
                Ok(())
            }

            Expression::Infix { token, left, right } => match token.kind {
                TokenKind::Assign | TokenKind::Declare => {
                    self.compile_assignment(token, left, right)
                }
                TokenKind::Comma => {
                    self.compile_sequence(Opcode::MakeTuple, token, expr.comma_elements().into_iter())
                }
                TokenKind::Dot => {
                    let name = member_name(right)?;
                    self.compile_expression(left)?;
                    self.emit_constant(Value::Str(name.to_string()))?;
                    self.emit(Opcode::LoadSubscript);
                    Ok(())
                }
                kind => {
                    let op = binary_opcode(kind)
                        .ok_or_else(|| CompileError::unsupported_operator(token))?;
                    self.compile_expression(left)?;
                    self.compile_expression(right)?;
                    self.emit(op);
                    Ok(())
                }
            },

            Expression::Index { left, index, .. } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::LoadSubscript);
                Ok(())
            }

            Expression::Call {
                token,
                function,
                arguments,
            } => self.compile_call(token, function, arguments),

            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => self.compile_if(condition, consequence, alternative.as_deref()),

            Expression::Match { input, branches, .. } => self.compile_match(input, branches),
        }
    }

    /// Elements in order, then `op` with the element count.
    fn compile_sequence<'e>(
        &mut self,
        op: Opcode,
        token: &Token,
        elements: impl ExactSizeIterator<Item = &'e Expression>,
    ) -> Result<(), CompileError> {
        let count = elements.len();
        for element in elements {
            self.compile_expression(element)?;
        }
        self.emit_count(op, token, count)
    }

    fn compile_block(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        self.emit(Opcode::OpenScope);
        self.scopes.push();

        if statements.is_empty() {
            self.emit_constant(Value::Nil)?;
        }
        for stmt in statements {
            self.compile_statement(stmt)?;
        }

        self.scopes.pop();
        self.emit(Opcode::CloseScope);
        Ok(())
    }

    /// `x = v`, `x := v`, `a[i] = v`, `a.k = v`.
    ///
    /// The value is duplicated before the store so the assignment itself
    /// evaluates to it.
    fn compile_assignment(
        &mut self,
        token: &Token,
        target: &Expression,
        value: &Expression,
    ) -> Result<(), CompileError> {
        let declare = token.kind == TokenKind::Declare;

        match target {
            Expression::Identifier { name, .. } => {
                self.compile_expression(value)?;
                self.emit(Opcode::Duplicate);
                let idx = self.add_name(name)?;
                if declare {
                    self.scopes.declare(name);
                    self.emit_u16(Opcode::DeclareName, idx);
                } else {
                    self.scopes.assign(name);
                    self.emit_u16(Opcode::StoreName, idx);
                }
                Ok(())
            }

            Expression::Index { left, index, .. } if !declare => {
                self.compile_expression(value)?;
                self.emit(Opcode::Duplicate);
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::StoreSubscript);
                Ok(())
            }

            Expression::Infix {
                token: dot,
                left,
                right,
            } if dot.kind == TokenKind::Dot && !declare => {
                let name = member_name(right)?;
                self.compile_expression(value)?;
                self.emit(Opcode::Duplicate);
                self.compile_expression(left)?;
                self.emit_constant(Value::Str(name.to_string()))?;
                self.emit(Opcode::StoreSubscript);
                Ok(())
            }

            other => Err(CompileError::invalid_target(token, other)),
        }
    }

    /// Plain calls push the callee after the arguments. A call on `recv.name`
    /// keeps the receiver on the stack under the looked-up method.
    fn compile_call(
        &mut self,
        token: &Token,
        function: &Expression,
        arguments: &[Expression],
    ) -> Result<(), CompileError> {
        for arg in arguments {
            self.compile_expression(arg)?;
        }
        let argc = u8::try_from(arguments.len())
            .map_err(|_| CompileError::too_many_elements(token, arguments.len(), super::MAX_COUNT))?;

        match function {
            Expression::Infix {
                token: dot,
                left: receiver,
                right: member,
            } if dot.kind == TokenKind::Dot => {
                let name = member_name(member)?;
                self.compile_expression(receiver)?;
                self.emit(Opcode::Duplicate);
                self.emit_constant(Value::Str(name.to_string()))?;
                self.emit(Opcode::LoadSubscript);
                self.emit_u8(Opcode::CallMethod, argc);
            }
            callee => {
                self.compile_expression(callee)?;
                self.emit_u8(Opcode::CallFunction, argc);
            }
        }
        Ok(())
    }

    /// Layout:
    ///
    /// ```text
    ///         <condition>
    ///         JUMP_UNLESS else
    ///         <consequence>
    ///         JUMP end
    /// else:   <alternative or nil>
    /// end:
    /// ```
    fn compile_if(
        &mut self,
        condition: &Expression,
        consequence: &Expression,
        alternative: Option<&Expression>,
    ) -> Result<(), CompileError> {
        self.compile_expression(condition)?;
        let else_slot = self.emit_jump(Opcode::JumpUnless)?;

        self.compile_expression(consequence)?;
        let end_slot = self.emit_jump(Opcode::Jump)?;

        let else_at = self.offset();
        self.patch_jump(else_slot, else_at);
        match alternative {
            Some(alt) => self.compile_expression(alt)?,
            None => self.emit_constant(Value::Nil)?,
        }

        let end = self.offset();
        self.patch_jump(end_slot, end);
        Ok(())
    }

    /// Each arm compares its condition against the input with `==`. The
    /// input stays on the stack until an arm is taken; with no match the
    /// result is `nil`.
    ///
    /// ```text
    ///         <input>
    /// arm:    DUPLICATE
    ///         <condition>
    ///         BINARY_EQUAL
    ///         JUMP_UNLESS next
    ///         POP
    ///         <body>
    ///         JUMP end
    /// next:   ... (next arm)
    ///         POP
    ///         LOAD_CONST nil
    /// end:
    /// ```
    fn compile_match(
        &mut self,
        input: &Expression,
        branches: &[MatchBranch],
    ) -> Result<(), CompileError> {
        self.compile_expression(input)?;

        let mut ends = Vec::with_capacity(branches.len());
        for branch in branches {
            self.emit(Opcode::Duplicate);
            self.compile_expression(&branch.condition)?;
            self.emit(Opcode::BinaryEqual);
            let next = self.emit_jump(Opcode::JumpUnless)?;

            self.emit(Opcode::Pop);
            self.compile_expression(&branch.body)?;
            ends.push(self.emit_jump(Opcode::Jump)?);

            let next_at = self.offset();
            self.patch_jump(next, next_at);
        }

        self.emit(Opcode::Pop);
        self.emit_constant(Value::Nil)?;

        let end = self.offset();
        for slot in ends {
            self.patch_jump(slot, end);
        }
        Ok(())
    }
}
