// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::sync::Arc;

use crate::bytecode::{Cell, CompiledFunction};
use crate::value::Value;

/// One function activation on the VM's frame stack.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The function being executed; its `free` list holds the frame's captured cells.
    pub func: Arc<CompiledFunction>,

    /// Instruction pointer (byte offset into `func.instructions`).
    pub ip: usize,

    /// Stack base: index of the first local slot. The callee sits at `base - 1`.
    pub base: usize,

    /// Locals promoted to cells by closure capture, allocated on first capture.
    promoted: Option<Vec<Option<Cell>>>,
}

impl Frame {
    pub fn new(func: Arc<CompiledFunction>, base: usize) -> Self {
        Self {
            func,
            ip: 0,
            base,
            promoted: None,
        }
    }

    /// The cell local `slot` was promoted to, if any.
    #[inline]
    pub fn cell(&self, slot: usize) -> Option<&Cell> {
        self.promoted.as_ref()?.get(slot)?.as_ref()
    }

    /// Promote local `slot` to a cell seeded with `current`, or return the
    /// existing cell. The flag is true when a new cell was created.
    pub fn promote(&mut self, slot: usize, current: Value) -> (Cell, bool) {
        let num_locals = self.func.num_locals.max(slot + 1);
        let promoted = self.promoted.get_or_insert_with(|| vec![None; num_locals]);
        if promoted.len() <= slot {
            promoted.resize(slot + 1, None);
        }
        match &promoted[slot] {
            Some(cell) => (cell.clone(), false),
            None => {
                let cell = Cell::new(current);
                promoted[slot] = Some(cell.clone());
                (cell, true)
            }
        }
    }

    /// Detach local `slot` from its cell so the next write starts a new binding.
    pub fn unbind(&mut self, slot: usize) {
        if let Some(entry) = self.promoted.as_mut().and_then(|p| p.get_mut(slot)) {
            *entry = None;
        }
    }

    /// Free variable `index` of the executing function.
    #[inline]
    pub fn free(&self, index: usize) -> Option<&Cell> {
        self.func.free.get(index)
    }
}
