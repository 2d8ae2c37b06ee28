// tarn-embed - Embedding API for the Tarn virtual machine
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! A compiled unit paired with its named globals.

use std::sync::Arc;

use tarn_vm::{Bytecode, Constants, RuntimeError, VM, Value, VmConfig};
use tracing::{debug, instrument};

use crate::context::Context;
use crate::convert::{FromValue, IntoValue};
use crate::error::{Error, Result};
use crate::globals::Globals;

/// A bytecode unit ready to run, with a name for each global slot.
///
/// Running the program and calling functions through its
/// [`context`](Self::context) operate on one globals vector.
///
/// # Example
///
/// ```rust
/// use tarn_embed::{Program, Value};
/// use tarn_vm::{Assembler, FunctionBuilder, OpCode};
///
/// // answer := 6 * 7
/// let mut asm = Assembler::new();
/// let six = asm.constant(6);
/// let seven = asm.constant(7);
/// let mut main = FunctionBuilder::new();
/// main.emit(OpCode::Constant, &[six])
///     .emit(OpCode::Constant, &[seven])
///     .emit(OpCode::Mul, &[])
///     .emit(OpCode::SetGlobal, &[0])
///     .emit(OpCode::Halt, &[]);
///
/// let program = Program::new(asm.finish(main.build()), ["answer"]);
/// program.run().unwrap();
/// assert_eq!(program.get_as::<i64>("answer"), Some(42));
/// ```
#[derive(Debug, Clone)]
pub struct Program {
    bytecode: Arc<Bytecode>,
    names: Vec<String>,
    globals: Globals,
    config: VmConfig,
}

impl Program {
    /// Create a program whose globals start out undefined.
    pub fn new<S: Into<String>>(
        bytecode: impl Into<Arc<Bytecode>>,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let globals = Globals::new(vec![Value::Undefined; names.len()]);
        Self {
            bytecode: bytecode.into(),
            names,
            globals,
            config: VmConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the top-level function over the current globals.
    ///
    /// Globals are written back only when the run completes.
    #[instrument(skip_all, fields(globals = self.names.len()))]
    pub fn run(&self) -> Result<Value> {
        let mut vm = VM::new(&self.bytecode, self.globals.snapshot(), &self.config)?;
        let result = vm.run()?;
        self.globals.replace(vm.into_globals());
        debug!(result = result.type_name(), "program finished");
        Ok(result)
    }

    /// Slot of the global called `name`.
    pub fn global_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// The names of all globals, in slot order.
    pub fn global_names(&self) -> &[String] {
        &self.names
    }

    /// Current value of a global.
    ///
    /// Returns `None` if no global has this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.global_index(name).and_then(|i| self.globals.get(i))
    }

    /// Current value of a global, converted.
    ///
    /// Returns `None` if no global has this name or the value does not convert.
    #[must_use]
    pub fn get_as<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| T::from_value(&v).ok())
    }

    /// Current value of a global, converted, with conversion errors reported.
    pub fn try_get_as<T: FromValue>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name) {
            Some(v) => Ok(Some(T::from_value(&v)?)),
            None => Ok(None),
        }
    }

    /// Overwrite a global.
    pub fn set(&self, name: &str, value: impl IntoValue) -> Result<()> {
        let index = self
            .global_index(name)
            .ok_or_else(|| Error::UnknownGlobal(name.to_string()))?;
        self.globals.set(index, value.into_value());
        Ok(())
    }

    /// Replace every global at once.
    pub fn replace_globals(&self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.names.len() {
            return Err(RuntimeError::InvalidGlobalsArray {
                reason: format!("expected {} globals, got {}", self.names.len(), values.len()),
                index: None,
            }
            .into());
        }
        self.globals.replace(values);
        Ok(())
    }

    pub fn constants(&self) -> &Constants {
        &self.bytecode.constants
    }

    /// A snapshot of the globals.
    pub fn globals(&self) -> Vec<Value> {
        self.globals.snapshot()
    }

    /// The live globals handle, shared with contexts from [`context`](Self::context).
    pub fn globals_handle(&self) -> Globals {
        self.globals.clone()
    }

    pub fn bytecode(&self) -> &Arc<Bytecode> {
        &self.bytecode
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// An execution context sharing this program's globals.
    pub fn context(&self) -> Result<Context> {
        Ok(Context::from_program(self)?)
    }
}
