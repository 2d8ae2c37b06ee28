// tarn-embed - Embedding API for the Tarn virtual machine
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared globals handle.

use std::sync::Arc;

use parking_lot::RwLock;
use tarn_vm::Value;

/// A cloneable handle to one globals vector.
///
/// Clones share the vector. Calls read a snapshot and store their result
/// back, so two calls racing on one handle resolve last-writer-wins; use
/// [`deep_copy`](Self::deep_copy) to give a worker its own vector.
#[derive(Debug, Clone, Default)]
pub struct Globals(Arc<RwLock<Vec<Value>>>);

impl Globals {
    pub fn new(values: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(values)))
    }

    /// A copy of the vector as it stands.
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Overwrite the whole vector.
    pub fn replace(&self, values: Vec<Value>) {
        *self.0.write() = values;
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Set slot `index`. Returns false when it is out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.0.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// A new, unshared handle over a deep copy of every value.
    pub fn deep_copy(&self) -> Self {
        let copied = self.0.read().iter().map(Value::deep_copy).collect();
        Self::new(copied)
    }

    /// Whether both handles refer to the same vector.
    pub fn ptr_eq(&self, other: &Globals) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<Value>> for Globals {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}
