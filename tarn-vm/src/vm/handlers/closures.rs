// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Closure creation and local capture.
//!
//! A `Closure` instruction resolves its prototype's free-variable descriptors
//! against the current frame. Captured locals are promoted to cells the first
//! time they are captured and keep that cell until rebound by `DefineLocal`,
//! so every closure capturing the same binding shares it.

use std::sync::Arc;

use tracing::trace;

use crate::bytecode::{Cell, CompiledFunction, FreeVar};
use crate::value::Value;
use crate::vm::{Result, RuntimeError, VM};

impl VM {
    pub(crate) fn execute_closure(&mut self) -> Result<()> {
        let idx = self.read_u16()? as usize;
        let proto = match self.get_constant(idx)? {
            Value::CompiledFunction(f) => f,
            other => {
                return Err(RuntimeError::Internal(format!(
                    "closure constant {idx} is {}, not a function",
                    other.type_name()
                )));
            }
        };

        let mut free = Vec::with_capacity(proto.free_vars.len());
        for desc in proto.free_vars.iter() {
            let cell = match *desc {
                FreeVar::Local(slot) => self.capture_local(slot as usize)?,
                FreeVar::Free(index) => self.forward_free(index as usize)?,
            };
            free.push(cell);
        }

        self.alloc()?;
        let closure = CompiledFunction {
            free,
            ..(*proto).clone()
        };
        trace!(constant = idx, free = closure.free.len(), "closure created");
        self.stack.push(Value::CompiledFunction(Arc::new(closure)))
    }

    /// Promote local `slot` of the current frame to a cell, or reuse the cell
    /// it already has.
    fn capture_local(&mut self, slot: usize) -> Result<Cell> {
        let base = self.frame()?.base;
        let current = self.stack.get(base + slot)?;
        let (cell, created) = self.frame_mut()?.promote(slot, current);
        if created {
            self.alloc()?;
        }
        Ok(cell)
    }

    /// Share a cell the current function already captured.
    fn forward_free(&self, index: usize) -> Result<Cell> {
        let frame = self.frame()?;
        frame.free(index).cloned().ok_or_else(|| {
            RuntimeError::Internal(format!(
                "free variable {index} out of range (have {})",
                frame.func.free.len()
            ))
        })
    }
}
