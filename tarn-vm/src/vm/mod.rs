// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing Tarn bytecode.
//!
//! A [`VM`] owns one operand stack, one frame stack and one globals vector for
//! the duration of a run. It is single-threaded and not reentrant; concurrency
//! happens one layer up, by giving each call its own VM.

pub mod error;
pub mod frame;
pub mod handlers;
pub mod invoke;
pub mod stack;

use std::sync::Arc;

use tracing::{debug, instrument, trace, warn};

use crate::bytecode::{Bytecode, Constants};
use crate::config::VmConfig;
use crate::opcode::OpCode;
use crate::value::Value;

pub use error::{Arity, Result, RuntimeError};
pub use frame::Frame;
pub use handlers::control::ControlFlow;
pub use invoke::validate_constants;
pub use stack::ValueStack;

/// The Tarn virtual machine.
pub struct VM {
    /// Constants pool shared with the bytecode unit.
    constants: Constants,

    /// Operand stack.
    stack: ValueStack,

    /// Call frame stack.
    frames: Vec<Frame>,

    /// Frame stack capacity.
    max_frames: usize,

    /// Global variables, indexed by compiler-assigned slot.
    globals: Vec<Value>,

    /// Allocations left before the run faults; `None` is unlimited.
    allocs_remaining: Option<u64>,
}

impl VM {
    /// Create a VM ready to run the top-level function of `bytecode`.
    pub fn new(bytecode: &Bytecode, globals: Vec<Value>, config: &VmConfig) -> Result<Self> {
        let mut vm = Self::detached(bytecode.constants.clone(), globals, config);
        let main = Arc::clone(&bytecode.main_function);
        for _ in 0..main.num_locals {
            vm.stack.push(Value::Undefined)?;
        }
        vm.push_frame(Frame::new(main, 0))?;
        Ok(vm)
    }

    /// A VM with no frames, for callers that seed their own.
    pub(crate) fn detached(constants: Constants, globals: Vec<Value>, config: &VmConfig) -> Self {
        Self {
            constants,
            stack: ValueStack::new(config.stack_size),
            frames: Vec::with_capacity(config.max_frames.min(64)),
            max_frames: config.max_frames,
            globals,
            allocs_remaining: config.max_allocs,
        }
    }

    /// Run until `Halt` or a return out of the outermost frame.
    ///
    /// Faults are fatal: the partial state is left behind and the error is
    /// returned to the caller.
    #[instrument(skip_all, fields(frames = self.frames.len()))]
    pub fn run(&mut self) -> Result<Value> {
        debug!(globals = self.globals.len(), "vm run started");
        match self.run_loop() {
            Ok(result) => {
                debug!(result = result.type_name(), sp = self.stack.len(), "vm halted");
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, depth = self.frames.len(), "vm faulted");
                Err(e)
            }
        }
    }

    /// The globals vector as it stands.
    pub fn globals(&self) -> &[Value] {
        &self.globals
    }

    /// Consume the VM, returning its globals.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// Current frame stack depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn run_loop(&mut self) -> Result<Value> {
        loop {
            let op = self.read_op()?;

            match op {
                // Constants & Stack - handled inline
                OpCode::Constant => {
                    let idx = self.read_u16()? as usize;
                    let val = self.get_constant(idx)?;
                    self.stack.push(val)?;
                }
                OpCode::Null => self.stack.push(Value::Undefined)?,
                OpCode::True => self.stack.push(Value::Bool(true))?,
                OpCode::False => self.stack.push(Value::Bool(false))?,
                OpCode::Pop => {
                    self.stack.pop()?;
                }

                // Equality and logical not never allocate
                OpCode::Equal => {
                    let b = self.stack.pop()?;
                    let a = self.stack.pop()?;
                    self.stack.push(Value::Bool(a == b))?;
                }
                OpCode::NotEqual => {
                    let b = self.stack.pop()?;
                    let a = self.stack.pop()?;
                    self.stack.push(Value::Bool(a != b))?;
                }
                OpCode::LNot => {
                    let val = self.stack.pop()?;
                    self.stack.push(Value::Bool(val.is_falsy()))?;
                }

                // Arithmetic & comparison - delegated to handler
                OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Rem
                | OpCode::BitAnd
                | OpCode::BitOr
                | OpCode::BitXor
                | OpCode::BitAndNot
                | OpCode::Shl
                | OpCode::Shr
                | OpCode::Less
                | OpCode::LessEq
                | OpCode::Greater
                | OpCode::GreaterEq
                | OpCode::Minus
                | OpCode::BComplement => {
                    self.execute_arithmetic(op)?;
                }

                // Variables - delegated to handler
                OpCode::GetGlobal
                | OpCode::SetGlobal
                | OpCode::GetLocal
                | OpCode::SetLocal
                | OpCode::DefineLocal
                | OpCode::GetFree
                | OpCode::SetFree
                | OpCode::GetBuiltin => {
                    self.execute_variables(op)?;
                }

                // Containers - delegated to handler
                OpCode::Array
                | OpCode::Map
                | OpCode::Error
                | OpCode::Index
                | OpCode::SliceIndex
                | OpCode::SetIndex => {
                    self.execute_collections(op)?;
                }

                OpCode::Closure => {
                    self.execute_closure()?;
                }

                // Control flow - delegated to handler
                OpCode::Jump
                | OpCode::JumpFalsy
                | OpCode::AndJump
                | OpCode::OrJump
                | OpCode::Call
                | OpCode::Return
                | OpCode::Halt => match self.execute_control(op)? {
                    ControlFlow::Continue => {}
                    ControlFlow::Halt(result) => return Ok(result),
                },
            }
        }
    }

    fn read_op(&mut self) -> Result<OpCode> {
        OpCode::try_from(self.read_u8()?)
    }

    #[inline]
    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::Internal("no active frame".into()))?;
        let byte = frame
            .func
            .instructions
            .get(frame.ip)
            .copied()
            .ok_or_else(|| RuntimeError::Internal("instruction pointer out of bounds".into()))?;
        frame.ip += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes([self.read_u8()?, self.read_u8()?]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes([
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
        ]))
    }

    pub(crate) fn frame(&self) -> Result<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::Internal("no active frame".into()))
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::Internal("no active frame".into()))
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) -> Result<()> {
        if self.frames.len() >= self.max_frames {
            return Err(RuntimeError::StackOverflow);
        }
        trace!(depth = self.frames.len() + 1, base = frame.base, "push frame");
        self.frames.push(frame);
        Ok(())
    }

    pub(crate) fn get_constant(&self, idx: usize) -> Result<Value> {
        self.constants
            .get(idx)
            .cloned()
            .ok_or(RuntimeError::ConstantOutOfRange {
                index: idx,
                length: self.constants.len(),
            })
    }

    /// Charge one heap allocation against the run's budget.
    pub(crate) fn alloc(&mut self) -> Result<()> {
        if let Some(remaining) = self.allocs_remaining.as_mut() {
            if *remaining == 0 {
                return Err(RuntimeError::ObjectAllocLimit);
            }
            *remaining -= 1;
        }
        Ok(())
    }

    pub(crate) fn jump(&mut self, target: usize) -> Result<()> {
        let frame = self.frame_mut()?;
        if target > frame.func.instructions.len() {
            return Err(RuntimeError::Internal(format!(
                "jump target {target} outside function of {} bytes",
                frame.func.instructions.len()
            )));
        }
        frame.ip = target;
        Ok(())
    }
}

/// Execute the top-level function of `bytecode` once.
///
/// Returns the halt value and the globals as left by the run.
pub fn run(
    bytecode: &Bytecode,
    globals: Vec<Value>,
    max_allocs: Option<u64>,
) -> Result<(Value, Vec<Value>)> {
    let config = VmConfig::default().with_max_allocs(max_allocs);
    let mut vm = VM::new(bytecode, globals, &config)?;
    let result = vm.run()?;
    Ok((result, vm.into_globals()))
}
