// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! A small bytecode assembler.
//!
//! [`Assembler`] owns the constants pool of one compilation unit and
//! [`FunctionBuilder`] the instruction stream of one function. Together they
//! produce a [`Bytecode`] without going through the compiler.
//!
//! ```
//! use tarn_vm::{Assembler, FunctionBuilder, OpCode, Value};
//!
//! let mut asm = Assembler::new();
//! let two = asm.constant(2);
//! let mut main = FunctionBuilder::new();
//! main.emit(OpCode::Constant, &[two])
//!     .emit(OpCode::Constant, &[two])
//!     .emit(OpCode::Add, &[])
//!     .emit(OpCode::Halt, &[]);
//! let bytecode = asm.finish(main.build());
//! let (result, _) = tarn_vm::run(&bytecode, vec![], None).unwrap();
//! assert_eq!(result, Value::Int(4));
//! ```

use crate::bytecode::{Bytecode, CompiledFunction, FreeVar};
use crate::opcode::{self, OpCode};
use crate::value::Value;

/// Builds the constants pool of a compilation unit.
#[derive(Debug, Default)]
pub struct Assembler {
    constants: Vec<Value>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a constant, reusing an identical scalar already in the pool.
    ///
    /// Containers and functions always get a fresh entry.
    pub fn constant(&mut self, value: impl Into<Value>) -> usize {
        let value = value.into();
        if let Some(idx) = self.constants.iter().position(|c| same_literal(c, &value)) {
            return idx;
        }
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Add a function prototype for `Closure` or as a plain constant.
    pub fn function(&mut self, func: CompiledFunction) -> usize {
        self.constants.push(Value::function(func));
        self.constants.len() - 1
    }

    /// Reserve an entry to be filled in later with [`set_constant`](Self::set_constant).
    pub fn reserve_constant(&mut self) -> usize {
        self.constants.push(Value::Undefined);
        self.constants.len() - 1
    }

    pub fn set_constant(&mut self, idx: usize, value: impl Into<Value>) {
        if let Some(slot) = self.constants.get_mut(idx) {
            *slot = value.into();
        }
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// Finish the unit with `main` as its top-level function.
    pub fn finish(self, main: CompiledFunction) -> Bytecode {
        Bytecode::new(main, self.constants)
    }
}

/// Builds the instruction stream and metadata of one function.
#[derive(Debug, Default)]
pub struct FunctionBuilder {
    instructions: Vec<u8>,
    num_locals: usize,
    num_parameters: usize,
    varargs: bool,
    free_vars: Vec<FreeVar>,
}

impl FunctionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `n` parameters. Parameters occupy the first local slots.
    pub fn params(mut self, n: usize) -> Self {
        self.num_parameters = n;
        self.num_locals = self.num_locals.max(n);
        self
    }

    /// Declare the total number of local slots, parameters included.
    pub fn locals(mut self, n: usize) -> Self {
        self.num_locals = n.max(self.num_parameters);
        self
    }

    /// Make the last parameter collect trailing arguments into an array.
    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    /// Append a free-variable descriptor, in capture order.
    pub fn free(mut self, var: FreeVar) -> Self {
        self.free_vars.push(var);
        self
    }

    /// Append one instruction.
    pub fn emit(&mut self, op: OpCode, operands: &[usize]) -> &mut Self {
        self.instructions.extend(opcode::make(op, operands));
        self
    }

    /// Byte offset of the next instruction, usable as a jump target.
    pub fn position(&self) -> usize {
        self.instructions.len()
    }

    /// Emit a jump with a placeholder target. Returns its offset for
    /// [`patch_jump`](Self::patch_jump).
    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        let at = self.position();
        self.emit(op, &[0]);
        at
    }

    /// Point the jump at `at` to `target`.
    pub fn patch_jump(&mut self, at: usize, target: usize) {
        let bytes = (target as u32).to_be_bytes();
        if let Some(operand) = self.instructions.get_mut(at + 1..at + 5) {
            operand.copy_from_slice(&bytes);
        }
    }

    pub fn build(self) -> CompiledFunction {
        CompiledFunction::new(self.instructions, self.num_locals, self.num_parameters)
            .with_varargs(self.varargs)
            .with_free_vars(self.free_vars)
    }
}

/// Literal identity for interning. Floats compare by bit pattern so `-0.0`
/// and `0.0` stay distinct and NaN payloads are kept apart.
fn same_literal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Bool(_), Value::Bool(_))
        | (Value::Int(_), Value::Int(_))
        | (Value::String(_), Value::String(_)) => a == b,
        _ => false,
    }
}
