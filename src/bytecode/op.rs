// =============================================================================
// OPCODE - one-byte instruction tags
// =============================================================================

/// A bytecode instruction tag.
///
/// Discriminants are dense from zero and stable: they are the byte written
/// into the instruction stream. Each opcode is followed by exactly
/// [`Opcode::operand_width`] operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop,

    // storage
    LoadConst,
    LoadName,
    StoreName,
    DeclareName,
    LoadSubscript,
    StoreSubscript,

    // unary
    UnaryInvert,
    UnaryNegate,

    // binary
    BinaryAdd,
    BinarySub,
    BinaryMul,
    BinaryDiv,
    BinaryExp,
    BinaryFloorDiv,
    BinaryMod,
    BinaryLogicOr,
    BinaryLogicAnd,
    BinaryBitOr,
    BinaryBitAnd,
    BinaryEqual,
    BinaryNotEqual,
    BinaryLess,
    BinaryMore,
    BinaryLessEq,
    BinaryMoreEq,

    // calls & scopes
    CallFunction,
    CallMethod,
    Return,
    OpenScope,
    CloseScope,

    // control flow
    Jump,
    JumpIf,
    JumpUnless,
    Break,
    Next,
    StartLoop,
    EndLoop,

    // aggregates
    MakeList,
    MakeTuple,
    MakeMap,

    // iteration
    PushIter,
    AdvIterFor,
    PopIter,

    // module & stack
    Export,
    Duplicate,
    Pop,
}

impl Opcode {
    /// Every opcode, indexed by its byte value.
    pub const ALL: [Opcode; 47] = [
        Opcode::Nop,
        Opcode::LoadConst,
        Opcode::LoadName,
        Opcode::StoreName,
        Opcode::DeclareName,
        Opcode::LoadSubscript,
        Opcode::StoreSubscript,
        Opcode::UnaryInvert,
        Opcode::UnaryNegate,
        Opcode::BinaryAdd,
        Opcode::BinarySub,
        Opcode::BinaryMul,
        Opcode::BinaryDiv,
        Opcode::BinaryExp,
        Opcode::BinaryFloorDiv,
        Opcode::BinaryMod,
        Opcode::BinaryLogicOr,
        Opcode::BinaryLogicAnd,
        Opcode::BinaryBitOr,
        Opcode::BinaryBitAnd,
        Opcode::BinaryEqual,
        Opcode::BinaryNotEqual,
        Opcode::BinaryLess,
        Opcode::BinaryMore,
        Opcode::BinaryLessEq,
        Opcode::BinaryMoreEq,
        Opcode::CallFunction,
        Opcode::CallMethod,
        Opcode::Return,
        Opcode::OpenScope,
        Opcode::CloseScope,
        Opcode::Jump,
        Opcode::JumpIf,
        Opcode::JumpUnless,
        Opcode::Break,
        Opcode::Next,
        Opcode::StartLoop,
        Opcode::EndLoop,
        Opcode::MakeList,
        Opcode::MakeTuple,
        Opcode::MakeMap,
        Opcode::PushIter,
        Opcode::AdvIterFor,
        Opcode::PopIter,
        Opcode::Export,
        Opcode::Duplicate,
        Opcode::Pop,
    ];

    /// Byte width of each operand, in order.
    pub fn operands(self) -> &'static [usize] {
        use Opcode::*;
        match self {
            LoadConst | LoadName | StoreName | DeclareName | Export => &[2],
            Jump | JumpIf | JumpUnless => &[2],
            AdvIterFor => &[2, 2],
            CallFunction | CallMethod | MakeList | MakeTuple | MakeMap => &[1],
            _ => &[],
        }
    }

    /// Total operand bytes following the opcode.
    pub fn operand_width(self) -> usize {
        self.operands().iter().sum()
    }

    /// True for instructions whose last operand is a jump-table slot.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jump | Opcode::JumpIf | Opcode::JumpUnless | Opcode::AdvIterFor
        )
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "NOP",
            LoadConst => "LOAD_CONST",
            LoadName => "LOAD_NAME",
            StoreName => "STORE_NAME",
            DeclareName => "DECLARE_NAME",
            LoadSubscript => "LOAD_SUBSCRIPT",
            StoreSubscript => "STORE_SUBSCRIPT",
            UnaryInvert => "UNARY_INVERT",
            UnaryNegate => "UNARY_NEGATE",
            BinaryAdd => "BINARY_ADD",
            BinarySub => "BINARY_SUB",
            BinaryMul => "BINARY_MUL",
            BinaryDiv => "BINARY_DIV",
            BinaryExp => "BINARY_EXP",
            BinaryFloorDiv => "BINARY_FLOOR_DIV",
            BinaryMod => "BINARY_MOD",
            BinaryLogicOr => "BINARY_LOGIC_OR",
            BinaryLogicAnd => "BINARY_LOGIC_AND",
            BinaryBitOr => "BINARY_BIT_OR",
            BinaryBitAnd => "BINARY_BIT_AND",
            BinaryEqual => "BINARY_EQUAL",
            BinaryNotEqual => "BINARY_NOT_EQUAL",
            BinaryLess => "BINARY_LESS",
            BinaryMore => "BINARY_MORE",
            BinaryLessEq => "BINARY_LESS_EQ",
            BinaryMoreEq => "BINARY_MORE_EQ",
            CallFunction => "CALL_FUNCTION",
            CallMethod => "CALL_METHOD",
            Return => "RETURN",
            OpenScope => "OPEN_SCOPE",
            CloseScope => "CLOSE_SCOPE",
            Jump => "JUMP",
            JumpIf => "JUMP_IF",
            JumpUnless => "JUMP_UNLESS",
            Break => "BREAK",
            Next => "NEXT",
            StartLoop => "START_LOOP",
            EndLoop => "END_LOOP",
            MakeList => "MAKE_LIST",
            MakeTuple => "MAKE_TUPLE",
            MakeMap => "MAKE_MAP",
            PushIter => "PUSH_ITER",
            AdvIterFor => "ADV_ITER_FOR",
            PopIter => "POP_ITER",
            Export => "EXPORT",
            Duplicate => "DUPLICATE",
            Pop => "POP",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::ALL.get(byte as usize).copied().ok_or(byte)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

// =============================================================================
// Operand encoding
// =============================================================================

pub fn encode_u16(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

pub fn decode_u16(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

// =============================================================================
// Decoding
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{byte:02x} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("{opcode} at offset {offset} is missing operand bytes")]
    Truncated { offset: usize, opcode: Opcode },
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset of the opcode.
    pub offset: usize,
    pub opcode: Opcode,
    /// Operand values, widened to `usize`.
    pub operands: Vec<usize>,
}

impl Instruction {
    /// Offset of the instruction that follows this one.
    pub fn next_offset(&self) -> usize {
        self.offset + 1 + self.opcode.operand_width()
    }

    /// The jump-table slot of a jump instruction.
    pub fn jump_slot(&self) -> Option<usize> {
        if self.opcode.is_jump() {
            self.operands.last().copied()
        } else {
            None
        }
    }
}

/// Iterates the instructions of a byte stream in order. Stops after the
/// first decoding error.
pub struct Instructions<'a> {
    code: &'a [u8],
    pos: usize,
}

impl<'a> Instructions<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self { code, pos: 0 }
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.pos;
        let byte = *self.code.get(offset)?;

        let opcode = match Opcode::try_from(byte) {
            Ok(op) => op,
            Err(byte) => {
                self.pos = self.code.len();
                return Some(Err(DecodeError::UnknownOpcode { offset, byte }));
            }
        };

        let mut at = offset + 1;
        let mut operands = Vec::with_capacity(opcode.operands().len());
        for &width in opcode.operands() {
            let value = match width {
                1 => self.code.get(at).map(|b| *b as usize),
                _ => self.code.get(at..).and_then(decode_u16).map(usize::from),
            };
            let Some(value) = value else {
                self.pos = self.code.len();
                return Some(Err(DecodeError::Truncated { offset, opcode }));
            };
            operands.push(value);
            at += width;
        }

        self.pos = at;
        Some(Ok(Instruction {
            offset,
            opcode,
            operands,
        }))
    }
}
