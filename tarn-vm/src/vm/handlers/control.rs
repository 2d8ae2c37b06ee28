// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Control flow opcode handlers: jumps, calls, returns and halting.

use std::sync::Arc;

use tracing::trace;

use crate::builtins::BuiltinFunction;
use crate::bytecode::CompiledFunction;
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::frame::Frame;
use crate::vm::{Result, RuntimeError, VM};

impl VM {
    /// Execute a control flow opcode.
    pub(crate) fn execute_control(&mut self, op: OpCode) -> Result<ControlFlow> {
        match op {
            OpCode::Jump => {
                let target = self.read_u32()? as usize;
                self.jump(target)?;
            }
            OpCode::JumpFalsy => {
                let target = self.read_u32()? as usize;
                if self.stack.pop()?.is_falsy() {
                    self.jump(target)?;
                }
            }
            OpCode::AndJump => {
                let target = self.read_u32()? as usize;
                if self.stack.peek(0)?.is_falsy() {
                    self.jump(target)?;
                } else {
                    self.stack.pop()?;
                }
            }
            OpCode::OrJump => {
                let target = self.read_u32()? as usize;
                if self.stack.peek(0)?.is_falsy() {
                    self.stack.pop()?;
                } else {
                    self.jump(target)?;
                }
            }

            OpCode::Call => {
                let argc = self.read_u8()? as usize;
                let spread = self.read_u8()? != 0;
                self.call(argc, spread)?;
            }
            OpCode::Return => {
                let has_value = self.read_u8()? != 0;
                let result = if has_value {
                    self.stack.pop()?
                } else {
                    Value::Undefined
                };

                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| RuntimeError::Internal("return without a frame".into()))?;

                // Returning out of the outermost frame ends the run
                if self.frames.is_empty() {
                    return Ok(ControlFlow::Halt(result));
                }

                // Replace the callee slot with the result
                let callee_slot = frame.base.checked_sub(1).ok_or(RuntimeError::StackUnderflow)?;
                self.stack.truncate(callee_slot);
                self.stack.push(result)?;
                trace!(depth = self.frames.len(), "return");
            }

            OpCode::Halt => {
                let frame = self.frame()?;
                let locals_top = frame.base + frame.func.num_locals;
                let result = if self.stack.len() > locals_top {
                    self.stack.peek(0)?.clone()
                } else {
                    Value::Undefined
                };
                return Ok(ControlFlow::Halt(result));
            }

            _ => {
                return Err(RuntimeError::Internal(format!(
                    "execute_control: unexpected opcode {op:?}"
                )));
            }
        }
        Ok(ControlFlow::Continue)
    }

    /// Call the value sitting beneath the top `argc` stack slots.
    pub(crate) fn call(&mut self, argc: usize, spread: bool) -> Result<()> {
        let argc = if spread {
            self.spread_last_argument(argc)?
        } else {
            argc
        };

        // Stack layout: [... callee arg0 arg1 ... argN]
        let fn_index = self
            .stack
            .len()
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow)?;

        match self.stack.get(fn_index)? {
            Value::CompiledFunction(func) => self.call_compiled(func, fn_index, argc),
            Value::BuiltinFunction(builtin) => self.call_builtin(&builtin, fn_index),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    /// Push a frame for `func`, whose callee slot is `fn_index` and whose
    /// `argc` arguments sit directly above it.
    pub(crate) fn call_compiled(
        &mut self,
        func: Arc<CompiledFunction>,
        fn_index: usize,
        argc: usize,
    ) -> Result<()> {
        func.check_arity(argc)?;
        let base = fn_index + 1;

        // Collect trailing arguments into the variadic parameter
        if func.varargs {
            let fixed = func.num_parameters.saturating_sub(1);
            let rest = self.stack.pop_n(argc - fixed)?;
            self.stack.push(Value::array(rest))?;
        }

        // Remaining declared locals start out undefined
        for _ in self.stack.len() - base..func.num_locals {
            self.stack.push(Value::Undefined)?;
        }

        trace!(argc, varargs = func.varargs, "call");
        self.push_frame(Frame::new(func, base))
    }

    /// Run a host function synchronously and splice its result over the callee.
    fn call_builtin(&mut self, builtin: &BuiltinFunction, fn_index: usize) -> Result<()> {
        let result = builtin.call(self.stack.slice_from(fn_index + 1)?)?;
        if !result.is_undefined() {
            self.alloc()?;
        }
        trace!(name = builtin.name(), "builtin call");
        self.stack.truncate(fn_index);
        self.stack.push(result)
    }

    /// Expand a trailing array argument in place. Returns the new argument count.
    fn spread_last_argument(&mut self, argc: usize) -> Result<usize> {
        if argc == 0 {
            return Ok(0);
        }
        match self.stack.pop()? {
            Value::Array(items) => {
                let items = items.read().clone();
                let count = items.len();
                for item in items {
                    self.stack.push(item)?;
                }
                Ok(argc - 1 + count)
            }
            other => Err(RuntimeError::InvalidArgumentType {
                name: "spread".into(),
                expected: "array",
                found: other.type_name(),
            }),
        }
    }
}

/// Control flow result from executing an opcode.
pub enum ControlFlow {
    /// Continue execution.
    Continue,
    /// Stop the run loop with the given value.
    Halt(Value),
}
