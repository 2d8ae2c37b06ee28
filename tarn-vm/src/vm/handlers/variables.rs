// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Variable opcode handlers: globals, locals, free variables and builtins.

use crate::builtins::builtins;
use crate::bytecode::Cell;
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::{Result, RuntimeError, VM};

impl VM {
    /// Execute a variable access opcode.
    pub(crate) fn execute_variables(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::GetGlobal => {
                let index = self.read_u16()? as usize;
                let value = self
                    .globals
                    .get(index)
                    .cloned()
                    .ok_or(RuntimeError::GlobalOutOfRange {
                        index,
                        length: self.globals.len(),
                    })?;
                self.stack.push(value)
            }
            OpCode::SetGlobal => {
                let index = self.read_u16()? as usize;
                let value = self.stack.pop()?;
                let length = self.globals.len();
                let slot = self
                    .globals
                    .get_mut(index)
                    .ok_or(RuntimeError::GlobalOutOfRange { index, length })?;
                *slot = value;
                Ok(())
            }

            // Locals promoted to cells are read and written through the cell
            OpCode::GetLocal => {
                let slot = self.read_u8()? as usize;
                let frame = self.frame()?;
                let value = match frame.cell(slot) {
                    Some(cell) => cell.get(),
                    None => self.stack.get(frame.base + slot)?,
                };
                self.stack.push(value)
            }
            OpCode::SetLocal => {
                let slot = self.read_u8()? as usize;
                let value = self.stack.pop()?;
                let frame = self.frame()?;
                if let Some(cell) = frame.cell(slot) {
                    cell.set(value);
                    return Ok(());
                }
                let index = frame.base + slot;
                self.stack.set(index, value)
            }
            OpCode::DefineLocal => {
                let slot = self.read_u8()? as usize;
                let value = self.stack.pop()?;
                let frame = self.frame_mut()?;
                frame.unbind(slot);
                let index = frame.base + slot;
                self.stack.set(index, value)
            }

            OpCode::GetFree => {
                let index = self.read_u8()? as usize;
                let value = self.free_cell(index)?.get();
                self.stack.push(value)
            }
            OpCode::SetFree => {
                let index = self.read_u8()? as usize;
                let value = self.stack.pop()?;
                self.free_cell(index)?.set(value);
                Ok(())
            }

            OpCode::GetBuiltin => {
                let index = self.read_u8()? as usize;
                let builtin = builtins()
                    .get(index)
                    .cloned()
                    .ok_or_else(|| RuntimeError::Internal(format!("unknown builtin {index}")))?;
                self.stack.push(Value::BuiltinFunction(builtin))
            }

            _ => Err(RuntimeError::Internal(format!(
                "execute_variables: unexpected opcode {op:?}"
            ))),
        }
    }

    fn free_cell(&self, index: usize) -> Result<&Cell> {
        let frame = self.frame()?;
        frame.free(index).ok_or_else(|| {
            RuntimeError::Internal(format!(
                "free variable {index} out of range (have {})",
                frame.func.free.len()
            ))
        })
    }
}
