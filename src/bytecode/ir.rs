use serde::{Deserialize, Serialize};

use crate::bytecode::op::{DecodeError, Instruction, Instructions};
use crate::lang::value::Value;

/// A compiled bytecode program.
///
/// Jump instructions carry an index into `jumps`, never a raw offset; the
/// table entry is the absolute byte offset in `code` to continue at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramBc {
    /// Instruction stream: opcodes followed by their operand bytes.
    pub code: Vec<u8>,

    /// Constant pool, referenced by `LoadConst`.
    pub constants: Vec<Value>,

    /// Unique names, referenced by the name instructions and `Export`.
    pub names: Vec<String>,

    /// Jump table: absolute offsets into `code`.
    pub jumps: Vec<usize>,
}

impl ProgramBc {
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions::new(&self.code)
    }

    /// Decodes the whole instruction stream.
    pub fn decode(&self) -> Result<Vec<Instruction>, DecodeError> {
        self.instructions().collect()
    }

    /// Resolves a jump-table slot to its target offset.
    pub fn jump_target(&self, slot: usize) -> Option<usize> {
        self.jumps.get(slot).copied()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
