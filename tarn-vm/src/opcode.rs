// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.
//!
//! An instruction is one opcode byte followed by its operands, encoded
//! big-endian. Jump targets are absolute byte offsets into the function's
//! instruction stream.

use crate::vm::{Result, RuntimeError};

/// Opcodes understood by the Tarn VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants & Stack
    // =========================================================================
    /// Push `constants[n]`.
    Constant,
    /// Push `undefined`.
    Null,
    True,
    False,
    /// Discard the top of the stack.
    Pop,

    // =========================================================================
    // Arithmetic & Bitwise
    // =========================================================================
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    BitAndNot,
    Shl,
    Shr,

    // =========================================================================
    // Comparison
    // =========================================================================
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equal,
    NotEqual,

    // =========================================================================
    // Unary
    // =========================================================================
    Minus,
    LNot,
    BComplement,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Unconditional jump.
    Jump,
    /// Pop and jump if falsy.
    JumpFalsy,
    /// Jump keeping the top of the stack if it is falsy, otherwise pop it.
    AndJump,
    /// Jump keeping the top of the stack if it is truthy, otherwise pop it.
    OrJump,

    // =========================================================================
    // Containers
    // =========================================================================
    /// Pop `n` elements and push them as an array.
    Array,
    /// Pop `n` key/value pairs and push them as a map.
    Map,
    /// Wrap the top of the stack in an error value.
    Error,
    Index,
    SliceIndex,
    SetIndex,

    // =========================================================================
    // Functions
    // =========================================================================
    /// Call with `argc` arguments; the second operand is the spread flag.
    Call,
    /// Return from the current frame; operand 1 returns the top of the stack.
    Return,

    // =========================================================================
    // Variables
    // =========================================================================
    GetGlobal,
    SetGlobal,
    GetLocal,
    SetLocal,
    /// Bind a local afresh, dropping any cell it was promoted to.
    DefineLocal,
    GetFree,
    SetFree,
    GetBuiltin,
    /// Instantiate the function prototype at `constants[n]` as a closure.
    Closure,

    /// Stop the run loop.
    Halt,
}

const OPCODES: [OpCode; 47] = [
    OpCode::Constant,
    OpCode::Null,
    OpCode::True,
    OpCode::False,
    OpCode::Pop,
    OpCode::Add,
    OpCode::Sub,
    OpCode::Mul,
    OpCode::Div,
    OpCode::Rem,
    OpCode::BitAnd,
    OpCode::BitOr,
    OpCode::BitXor,
    OpCode::BitAndNot,
    OpCode::Shl,
    OpCode::Shr,
    OpCode::Less,
    OpCode::LessEq,
    OpCode::Greater,
    OpCode::GreaterEq,
    OpCode::Equal,
    OpCode::NotEqual,
    OpCode::Minus,
    OpCode::LNot,
    OpCode::BComplement,
    OpCode::Jump,
    OpCode::JumpFalsy,
    OpCode::AndJump,
    OpCode::OrJump,
    OpCode::Array,
    OpCode::Map,
    OpCode::Error,
    OpCode::Index,
    OpCode::SliceIndex,
    OpCode::SetIndex,
    OpCode::Call,
    OpCode::Return,
    OpCode::GetGlobal,
    OpCode::SetGlobal,
    OpCode::GetLocal,
    OpCode::SetLocal,
    OpCode::DefineLocal,
    OpCode::GetFree,
    OpCode::SetFree,
    OpCode::GetBuiltin,
    OpCode::Closure,
    OpCode::Halt,
];

impl TryFrom<u8> for OpCode {
    type Error = RuntimeError;

    fn try_from(byte: u8) -> Result<Self> {
        OPCODES
            .get(byte as usize)
            .copied()
            .ok_or(RuntimeError::InvalidOpcode(byte))
    }
}

impl OpCode {
    /// Byte widths of this instruction's operands.
    pub fn operand_widths(self) -> &'static [usize] {
        match self {
            OpCode::Constant
            | OpCode::Array
            | OpCode::Map
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::Closure => &[2],
            OpCode::Jump | OpCode::JumpFalsy | OpCode::AndJump | OpCode::OrJump => &[4],
            OpCode::Return
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::DefineLocal
            | OpCode::GetFree
            | OpCode::SetFree
            | OpCode::GetBuiltin => &[1],
            OpCode::Call => &[1, 1],
            _ => &[],
        }
    }

    /// Total encoded size of the instruction in bytes.
    pub fn width(self) -> usize {
        1 + self.operand_widths().iter().sum::<usize>()
    }

    /// Returns true if this opcode transfers control to another offset.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            OpCode::Jump | OpCode::JumpFalsy | OpCode::AndJump | OpCode::OrJump
        )
    }
}

/// Encode one instruction.
///
/// Operands are truncated to their declared widths; the assembler checks
/// ranges before calling this.
pub fn make(op: OpCode, operands: &[usize]) -> Vec<u8> {
    let mut out = Vec::with_capacity(op.width());
    out.push(op as u8);
    for (operand, width) in operands.iter().zip(op.operand_widths()) {
        match width {
            1 => out.push(*operand as u8),
            2 => out.extend_from_slice(&(*operand as u16).to_be_bytes()),
            4 => out.extend_from_slice(&(*operand as u32).to_be_bytes()),
            _ => {}
        }
    }
    out
}

/// Decode the operands of `op` from `ins`, which starts just past the opcode.
///
/// Returns the operands and the number of bytes read.
pub fn read_operands(op: OpCode, ins: &[u8]) -> Result<(Vec<usize>, usize)> {
    let mut operands = Vec::with_capacity(op.operand_widths().len());
    let mut offset = 0;
    for &width in op.operand_widths() {
        let bytes = ins
            .get(offset..offset + width)
            .ok_or_else(|| RuntimeError::Internal(format!("truncated operand for {op:?}")))?;
        let value = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
        operands.push(value);
        offset += width;
    }
    Ok((operands, offset))
}

/// Disassemble an instruction stream, one line per instruction.
///
/// Undecodable bytes are reported inline and stop the listing.
pub fn format_instructions(ins: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut ip = 0;
    while ip < ins.len() {
        let op = match OpCode::try_from(ins[ip]) {
            Ok(op) => op,
            Err(e) => {
                lines.push(format!("{ip:04} <{e}>"));
                break;
            }
        };
        match read_operands(op, &ins[ip + 1..]) {
            Ok((operands, read)) => {
                let rendered: Vec<String> = operands.iter().map(usize::to_string).collect();
                if rendered.is_empty() {
                    lines.push(format!("{ip:04} {op:?}"));
                } else {
                    lines.push(format!("{ip:04} {op:?} {}", rendered.join(" ")));
                }
                ip += 1 + read;
            }
            Err(e) => {
                lines.push(format!("{ip:04} {op:?} <{e}>"));
                break;
            }
        }
    }
    lines
}
