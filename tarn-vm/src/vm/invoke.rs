// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Calling compiled functions from outside a script run.
//!
//! A function extracted from a finished run has no enclosing frame. The VM is
//! seeded with a root frame whose only instruction is `Halt`, with the callee
//! pushed above it. Returning from the callee lands in the root frame, which
//! halts with the returned value on top of the stack.

use std::sync::{Arc, OnceLock};

use tracing::{debug, instrument};

use crate::bytecode::{CompiledFunction, Constants};
use crate::config::VmConfig;
use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::frame::Frame;
use crate::vm::{Result, RuntimeError, VM};

static ROOT_FUNCTION: OnceLock<Arc<CompiledFunction>> = OnceLock::new();

/// The halting stub every out-of-band call runs on top of.
fn root_function() -> Arc<CompiledFunction> {
    Arc::clone(
        ROOT_FUNCTION.get_or_init(|| Arc::new(CompiledFunction::new(vec![OpCode::Halt as u8], 0, 0))),
    )
}

/// Check that every constants entry was filled in by the compiler.
pub fn validate_constants(constants: &[Value]) -> Result<()> {
    match constants.iter().position(Value::is_undefined) {
        Some(index) => Err(RuntimeError::InvalidConstantsArray {
            reason: "nil constant".into(),
            index: Some(index),
        }),
        None => Ok(()),
    }
}

impl CompiledFunction {
    /// Call this function with an explicit constants pool, globals and
    /// arguments, using default limits.
    ///
    /// Returns the result and the globals as left by the call.
    pub fn call_with_globals_and_constants(
        self: &Arc<Self>,
        constants: Option<&Constants>,
        globals: Vec<Value>,
        args: &[Value],
    ) -> Result<(Value, Vec<Value>)> {
        self.call_with_config(constants, globals, args, &VmConfig::default())
    }

    /// As [`call_with_globals_and_constants`](Self::call_with_globals_and_constants),
    /// with explicit VM limits.
    ///
    /// Validation happens before any VM exists: missing constants, empty
    /// constants entries and arity mismatches execute no instruction.
    #[instrument(skip_all, fields(argc = args.len(), closure = self.is_closure()))]
    pub fn call_with_config(
        self: &Arc<Self>,
        constants: Option<&Constants>,
        globals: Vec<Value>,
        args: &[Value],
        config: &VmConfig,
    ) -> Result<(Value, Vec<Value>)> {
        let constants = constants.ok_or_else(|| {
            RuntimeError::missing("compiled-function", "constants from original compilation", None)
        })?;
        validate_constants(constants)?;
        self.check_arity(args.len())?;

        let mut vm = VM::detached(Arc::clone(constants), globals, config);
        vm.enter(self, args)?;
        let result = vm.run()?;
        debug!(result = result.type_name(), "out-of-band call finished");
        Ok((result, vm.into_globals()))
    }
}

impl VM {
    /// Seed the root frame and a frame for `func` called with `args`.
    fn enter(&mut self, func: &Arc<CompiledFunction>, args: &[Value]) -> Result<()> {
        self.push_frame(Frame::new(root_function(), 0))?;
        self.stack.push(Value::CompiledFunction(Arc::clone(func)))?;
        for arg in args {
            self.stack.push(arg.clone())?;
        }
        self.call_compiled(Arc::clone(func), 0, args.len())
    }
}
