use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    bytecode::{
        compile_error::CompileError,
        ir::ProgramBc,
        op::{Opcode, encode_u16},
        scope::ScopeStack,
    },
    frontend::token::Token,
    lang::{
        node::{Expression, Statement},
        program::Program,
        value::Value,
    },
};

mod expressions;

/// Largest element count a `Make*` or call instruction can encode.
pub const MAX_COUNT: usize = u8::MAX as usize;

/// Largest number of entries a u16-indexed pool can hold.
pub const MAX_POOL: usize = u16::MAX as usize + 1;

/// Compiles one unit of Quill syntax into a flat [`ProgramBc`].
///
/// Forward jumps are resolved by backpatching: the jump instruction is
/// written with the index of a reserved jump-table slot, and the slot is
/// filled once the target offset is known. The instruction bytes are never
/// rewritten.
pub struct Compiler {
    /// Output instruction stream
    code: Vec<u8>,

    /// Constant pool (no deduplication)
    constants: Vec<Value>,

    /// Name pool and its reverse index
    names: Vec<String>,
    name_index: HashMap<String, u16>,

    /// Jump table; `None` marks a slot waiting for its target
    jumps: Vec<Option<usize>>,

    /// Compile-time mirror of runtime scopes
    scopes: ScopeStack,

    /// Number of enclosing loops, for `break` / `next` validation
    loop_depth: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            constants: Vec::new(),
            names: Vec::new(),
            name_index: HashMap::new(),
            jumps: Vec::new(),
            scopes: ScopeStack::new(),
            loop_depth: 0,
        }
    }

    /// Compiles every statement of `program` in order and finalizes the unit.
    pub fn compile_program(mut self, program: &Program) -> Result<ProgramBc, CompileError> {
        debug!(statements = program.statements.len(), "compiling unit");

        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }

        self.finish()
    }

    /// Finalizes the unit. Fails if any reserved jump slot was left
    /// unpatched.
    pub fn finish(self) -> Result<ProgramBc, CompileError> {
        let jumps = self
            .jumps
            .iter()
            .enumerate()
            .map(|(slot, target)| target.ok_or(CompileError::UnpatchedJump { slot }))
            .collect::<Result<Vec<usize>, CompileError>>()?;

        debug!(
            bytes = self.code.len(),
            constants = self.constants.len(),
            names = self.names.len(),
            jumps = jumps.len(),
            "unit compiled"
        );

        Ok(ProgramBc {
            code: self.code,
            constants: self.constants,
            names: self.names,
            jumps,
        })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn compile_statement(&mut self, stmt: &Statement) -> Result<(), CompileError> {
        match stmt {
            Statement::Expression { expr, .. } => self.compile_expression(expr),

            Statement::Return { value, .. } => {
                match value {
                    Some(value) => self.compile_expression(value)?,
                    None => self.emit_constant(Value::Nil)?,
                }
                self.emit(Opcode::Return);
                Ok(())
            }

            Statement::Break { token } => self.compile_loop_control(token, Opcode::Break, "break"),
            Statement::Next { token } => self.compile_loop_control(token, Opcode::Next, "next"),

            Statement::While {
                condition, body, ..
            } => self.compile_while(condition, body),

            Statement::For {
                var,
                collection,
                body,
                ..
            } => self.compile_for(var, collection, body),

            Statement::Export { token, names } => self.compile_export(token, names),

            Statement::Import { token, .. } => {
                Err(CompileError::unsupported_statement(token, stmt.kind_name()))
            }
        }
    }

    fn compile_loop_control(
        &mut self,
        token: &Token,
        op: Opcode,
        keyword: &'static str,
    ) -> Result<(), CompileError> {
        if self.loop_depth == 0 {
            return Err(CompileError::outside_loop(token, keyword));
        }
        self.emit(op);
        Ok(())
    }

    /// Layout:
    ///
    /// ```text
    ///         START_LOOP
    /// top:    <condition>
    ///         JUMP_UNLESS exit
    ///         <body>
    ///         JUMP top
    /// exit:   END_LOOP
    /// ```
    fn compile_while(&mut self, condition: &Expression, body: &Expression) -> Result<(), CompileError> {
        self.emit(Opcode::StartLoop);
        let top = self.offset();
        debug!(top, "while loop");

        self.compile_expression(condition)?;
        let exit = self.emit_jump(Opcode::JumpUnless)?;

        self.in_loop(|c| c.compile_expression(body))?;
        self.emit_jump_to(Opcode::Jump, top)?;

        let end = self.offset();
        self.patch_jump(exit, end);
        self.emit(Opcode::EndLoop);
        Ok(())
    }

    /// Layout:
    ///
    /// ```text
    ///         <collection>
    ///         PUSH_ITER
    ///         START_LOOP
    /// top:    ADV_ITER_FOR var exit
    ///         <body>
    ///         JUMP top
    /// exit:   END_LOOP
    ///         POP_ITER
    /// ```
    fn compile_for(
        &mut self,
        var: &Expression,
        collection: &Expression,
        body: &Expression,
    ) -> Result<(), CompileError> {
        let Expression::Identifier { name, .. } = var else {
            return Err(CompileError::invalid_loop_counter(var.token(), var));
        };

        self.compile_expression(collection)?;
        let name_idx = self.add_name(name)?;

        self.emit(Opcode::PushIter);
        self.emit(Opcode::StartLoop);
        let top = self.offset();
        debug!(top, var = %name, "for loop");

        let exit = self.reserve_jump()?;
        self.emit(Opcode::AdvIterFor);
        self.push_u16(name_idx);
        self.push_u16(exit);
        self.scopes.declare(name);

        self.in_loop(|c| c.compile_expression(body))?;
        self.emit_jump_to(Opcode::Jump, top)?;

        let end = self.offset();
        self.patch_jump(exit, end);
        self.emit(Opcode::EndLoop);
        self.emit(Opcode::PopIter);
        Ok(())
    }

    /// `export a` or `export a, b`; a non-empty parenthesized tuple of names
    /// is also accepted. Every name is checked before anything is emitted.
    fn compile_export(&mut self, token: &Token, names: &Expression) -> Result<(), CompileError> {
        let elements: Vec<&Expression> = match names {
            Expression::Tuple { elements, .. } => elements.iter().collect(),
            other => other.comma_elements(),
        };
        if elements.is_empty() {
            return Err(CompileError::malformed_export(token));
        }

        let mut indices = Vec::with_capacity(elements.len());
        for element in elements {
            let Expression::Identifier { name, .. } = element else {
                return Err(CompileError::malformed_export(token));
            };
            indices.push(self.add_name(name)?);
        }

        for idx in indices {
            self.emit_u16(Opcode::Export, idx);
        }
        Ok(())
    }

    /// Runs `f` with `break` and `next` allowed.
    fn in_loop<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        self.loop_depth += 1;
        let result = f(self);
        self.loop_depth -= 1;
        result
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Offset the next emitted byte will land at.
    fn offset(&self) -> usize {
        self.code.len()
    }

    /// Appends an opcode and returns its offset.
    fn emit(&mut self, op: Opcode) -> usize {
        let at = self.offset();
        self.code.push(op as u8);
        at
    }

    fn push_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&encode_u16(value));
    }

    fn emit_u16(&mut self, op: Opcode, operand: u16) -> usize {
        let at = self.emit(op);
        self.push_u16(operand);
        at
    }

    fn emit_u8(&mut self, op: Opcode, operand: u8) -> usize {
        let at = self.emit(op);
        self.code.push(operand);
        at
    }

    /// Emits an element-count instruction, checking the count fits a byte.
    fn emit_count(&mut self, op: Opcode, token: &Token, count: usize) -> Result<(), CompileError> {
        let operand = u8::try_from(count)
            .map_err(|_| CompileError::too_many_elements(token, count, MAX_COUNT))?;
        self.emit_u8(op, operand);
        Ok(())
    }

    fn emit_constant(&mut self, value: Value) -> Result<(), CompileError> {
        let idx = self.add_constant(value)?;
        self.emit_u16(Opcode::LoadConst, idx);
        Ok(())
    }

    // =========================================================================
    // Jumps
    // =========================================================================

    fn new_slot(&mut self, target: Option<usize>) -> Result<u16, CompileError> {
        let slot = u16::try_from(self.jumps.len()).map_err(|_| CompileError::PoolOverflow {
            pool: "jump",
            max: MAX_POOL,
        })?;
        self.jumps.push(target);
        Ok(slot)
    }

    /// Reserves a slot for a forward jump whose target is not known yet.
    fn reserve_jump(&mut self) -> Result<u16, CompileError> {
        self.new_slot(None)
    }

    /// Emits a forward jump through a reserved slot; returns the slot to
    /// patch.
    fn emit_jump(&mut self, op: Opcode) -> Result<u16, CompileError> {
        let slot = self.reserve_jump()?;
        let at = self.emit_u16(op, slot);
        trace!(op = %op, at, slot, "forward jump");
        Ok(slot)
    }

    /// Emits a jump to an already known offset.
    fn emit_jump_to(&mut self, op: Opcode, target: usize) -> Result<(), CompileError> {
        let slot = self.new_slot(Some(target))?;
        let at = self.emit_u16(op, slot);
        trace!(op = %op, at, slot, target, "jump");
        Ok(())
    }

    fn patch_jump(&mut self, slot: u16, target: usize) {
        trace!(slot, target, "patch jump");
        if let Some(entry) = self.jumps.get_mut(slot as usize) {
            *entry = Some(target);
        }
    }

    // =========================================================================
    // Pools
    // =========================================================================

    /// Index of `name` in the name pool, adding it on first use.
    fn add_name(&mut self, name: &str) -> Result<u16, CompileError> {
        if let Some(&idx) = self.name_index.get(name) {
            return Ok(idx);
        }

        let idx = u16::try_from(self.names.len()).map_err(|_| CompileError::PoolOverflow {
            pool: "name",
            max: MAX_POOL,
        })?;
        self.names.push(name.to_string());
        self.name_index.insert(name.to_string(), idx);
        Ok(idx)
    }

    /// Appends a constant; equal constants get separate entries.
    fn add_constant(&mut self, value: Value) -> Result<u16, CompileError> {
        let idx = u16::try_from(self.constants.len()).map_err(|_| CompileError::PoolOverflow {
            pool: "constant",
            max: MAX_POOL,
        })?;
        self.constants.push(value);
        Ok(idx)
    }
}
