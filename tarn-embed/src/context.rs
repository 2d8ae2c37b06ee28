// tarn-embed - Embedding API for the Tarn virtual machine
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Execution contexts for calling compiled functions from the host.
//!
//! A [`Context`] bundles what a compiled function needs to run outside the
//! script that produced it: the constants pool of its compilation unit and
//! a globals vector. Every call gets a private VM, so one context can be
//! used from many threads.
//!
//! ```
//! use std::sync::Arc;
//! use tarn_embed::{Context, Value};
//! use tarn_vm::{Assembler, FunctionBuilder, OpCode};
//!
//! // double := func(x) { return x * 2 }
//! let mut asm = Assembler::new();
//! let two = asm.constant(2);
//! let mut double = FunctionBuilder::new().params(1);
//! double
//!     .emit(OpCode::GetLocal, &[0])
//!     .emit(OpCode::Constant, &[two])
//!     .emit(OpCode::Mul, &[])
//!     .emit(OpCode::Return, &[1]);
//! let double = Value::function(double.build());
//! let mut main = FunctionBuilder::new();
//! main.emit(OpCode::Halt, &[]);
//! let bytecode = Arc::new(asm.finish(main.build()));
//!
//! let ctx = Context::new(Some(bytecode.constants.clone()), vec![], Some(bytecode)).unwrap();
//! assert_eq!(ctx.call(&double, &[Value::Int(21)]).unwrap(), Value::Int(42));
//! ```

use std::sync::Arc;

use tarn_vm::{Bytecode, Constants, Result, RuntimeError, Value, VmConfig, validate_constants};
use tracing::{debug, instrument};

use crate::globals::Globals;
use crate::program::Program;

/// Constants, globals and limits for out-of-band calls.
///
/// Contexts derived with [`with_globals`](Self::with_globals) share the
/// constants pool and source; [`with_isolated_globals`](Self::with_isolated_globals)
/// additionally detaches the globals.
#[derive(Debug, Clone)]
pub struct Context {
    constants: Constants,
    globals: Globals,
    source: Arc<Bytecode>,
    config: VmConfig,
}

impl Context {
    /// Create a context, validating it once up front.
    ///
    /// # Errors
    ///
    /// - `InvalidExecutionContext` without a source unit
    /// - `MissingExecutionContext` without a constants pool
    /// - `InvalidConstantsArray` when a constants entry is empty
    pub fn new(
        constants: Option<Constants>,
        globals: impl Into<Globals>,
        source: Option<Arc<Bytecode>>,
    ) -> Result<Self> {
        let source = source.ok_or(RuntimeError::InvalidExecutionContext)?;
        let constants =
            constants.ok_or_else(|| RuntimeError::missing("execution-context", "constants", None))?;
        validate_constants(&constants)?;
        let globals = globals.into();
        debug!(constants = constants.len(), globals = globals.len(), "execution context created");
        Ok(Self {
            constants,
            globals,
            source,
            config: VmConfig::default(),
        })
    }

    /// A context over the program's unit that shares its globals.
    pub fn from_program(program: &Program) -> Result<Self> {
        Self::new(
            Some(program.constants().clone()),
            program.globals_handle(),
            Some(Arc::clone(program.bytecode())),
        )
        .map(|ctx| ctx.with_config(program.config().clone()))
    }

    /// The same constants and source over a different globals vector.
    #[must_use]
    pub fn with_globals(&self, globals: impl Into<Globals>) -> Self {
        Self {
            globals: globals.into(),
            ..self.clone()
        }
    }

    /// The same constants and source over a deep copy of the globals.
    ///
    /// Calls through the result never observe, or cause, writes through this
    /// context.
    #[must_use]
    pub fn with_isolated_globals(&self) -> Self {
        self.with_globals(self.globals.deep_copy())
    }

    /// Replace the VM limits used by calls.
    #[must_use]
    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    /// Call `func` with `args`, returning its result.
    pub fn call(&self, func: &Value, args: &[Value]) -> Result<Value> {
        self.call_ex(func, args).map(|(result, _)| result)
    }

    /// Call `func` with `args`, returning its result and the globals as the
    /// call left them.
    ///
    /// Globals are snapshotted before the call and written back to this
    /// context's handle when it succeeds. A failed call leaves them untouched.
    #[instrument(skip_all, fields(argc = args.len()))]
    pub fn call_ex(&self, func: &Value, args: &[Value]) -> Result<(Value, Vec<Value>)> {
        match func {
            Value::CompiledFunction(f) => {
                let snapshot = self.globals.snapshot();
                let (result, globals) =
                    f.call_with_config(Some(&self.constants), snapshot, args, &self.config)?;
                self.globals.replace(globals.clone());
                debug!(result = result.type_name(), "globals written back");
                Ok((result, globals))
            }
            Value::BuiltinFunction(b) => Ok((b.call(args)?, self.globals.snapshot())),
            Value::Undefined => Err(RuntimeError::missing(
                "execution-context",
                "compiled function",
                Some("provide a valid CompiledFunction"),
            )),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// A snapshot of the globals.
    pub fn globals(&self) -> Vec<Value> {
        self.globals.snapshot()
    }

    /// The live globals handle.
    pub fn globals_handle(&self) -> &Globals {
        &self.globals
    }

    /// The unit the constants came from.
    pub fn source(&self) -> &Arc<Bytecode> {
        &self.source
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Re-check the constants pool.
    pub fn validate(&self) -> Result<()> {
        validate_constants(&self.constants)
    }
}
