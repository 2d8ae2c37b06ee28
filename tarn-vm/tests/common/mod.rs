// tarn-vm - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared test helpers for Tarn VM integration tests.
//!
//! The assembler stands in for the compiler: helpers here build small
//! bytecode units that mirror short Tarn scripts, quoted in each doc comment.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::sync::Arc;

pub use tarn_vm::{
    Assembler, Bytecode, CompiledFunction, FreeVar, FunctionBuilder, OpCode, RuntimeError, Value,
    VmConfig,
};

/// Install a test subscriber once; `RUST_LOG=tarn_vm=trace` shows the VM.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a unit whose main function runs `build` and then halts.
pub fn script(build: impl FnOnce(&mut Assembler, &mut FunctionBuilder)) -> Bytecode {
    let mut asm = Assembler::new();
    let mut main = FunctionBuilder::new();
    build(&mut asm, &mut main);
    main.emit(OpCode::Halt, &[]);
    asm.finish(main.build())
}

/// Run `bytecode` with `num_globals` undefined globals.
pub fn run_script(bytecode: &Bytecode, num_globals: usize) -> (Value, Vec<Value>) {
    init_tracing();
    tarn_vm::run(bytecode, vec![Value::Undefined; num_globals], None).expect("run failed")
}

/// Run `bytecode`, expecting a fault.
pub fn run_script_err(bytecode: &Bytecode, num_globals: usize) -> RuntimeError {
    init_tracing();
    tarn_vm::run(bytecode, vec![Value::Undefined; num_globals], None).expect_err("run succeeded")
}

/// Run `bytecode` under explicit limits.
pub fn run_with_config(
    bytecode: &Bytecode,
    num_globals: usize,
    config: &VmConfig,
) -> tarn_vm::Result<Value> {
    init_tracing();
    let mut vm = tarn_vm::VM::new(bytecode, vec![Value::Undefined; num_globals], config)?;
    vm.run()
}

/// The compiled function stored in global `index`.
pub fn global_fn(globals: &[Value], index: usize) -> Arc<CompiledFunction> {
    match &globals[index] {
        Value::CompiledFunction(f) => Arc::clone(f),
        other => panic!("global {index} is {other}, not a function"),
    }
}

/// Unwrap a compiled function value.
pub fn as_fn(value: &Value) -> Arc<CompiledFunction> {
    match value {
        Value::CompiledFunction(f) => Arc::clone(f),
        other => panic!("{other} is not a function"),
    }
}

/// Emit `callee(args...)` where the callee is global `global` and every
/// argument is a constant index.
pub fn call_global(main: &mut FunctionBuilder, global: usize, args: &[usize]) {
    main.emit(OpCode::GetGlobal, &[global]);
    for arg in args {
        main.emit(OpCode::Constant, &[*arg]);
    }
    main.emit(OpCode::Call, &[args.len(), 0]);
}

// =============================================================================
// Canned scripts
// =============================================================================

/// Global slots of [`counter_script`].
pub const COUNTER: usize = 0;
pub const INC: usize = 1;

/// ```text
/// counter := 0
/// inc := func() { counter += 1; return counter }
/// ```
pub fn counter_script() -> Bytecode {
    script(|asm, main| {
        let zero = asm.constant(0);
        let one = asm.constant(1);

        let mut inc = FunctionBuilder::new();
        inc.emit(OpCode::GetGlobal, &[COUNTER])
            .emit(OpCode::Constant, &[one])
            .emit(OpCode::Add, &[])
            .emit(OpCode::SetGlobal, &[COUNTER])
            .emit(OpCode::GetGlobal, &[COUNTER])
            .emit(OpCode::Return, &[1]);
        let inc = asm.function(inc.build());

        main.emit(OpCode::Constant, &[zero])
            .emit(OpCode::SetGlobal, &[COUNTER])
            .emit(OpCode::Constant, &[inc])
            .emit(OpCode::SetGlobal, &[INC]);
    })
}

/// Global slot of `make_counter` in [`make_counter_script`].
pub const MAKE_COUNTER: usize = 0;

/// Add the `make_counter` prototype to `asm`, returning its constant index.
///
/// ```text
/// make_counter := func() {
///     count := 0
///     return func() { count += 1; return count }
/// }
/// ```
pub fn make_counter_fn(asm: &mut Assembler) -> usize {
    let zero = asm.constant(0);
    let one = asm.constant(1);

    let mut inner = FunctionBuilder::new().free(FreeVar::Local(0));
    inner
        .emit(OpCode::GetFree, &[0])
        .emit(OpCode::Constant, &[one])
        .emit(OpCode::Add, &[])
        .emit(OpCode::SetFree, &[0])
        .emit(OpCode::GetFree, &[0])
        .emit(OpCode::Return, &[1]);
    let inner = asm.function(inner.build());

    let mut maker = FunctionBuilder::new().locals(1);
    maker
        .emit(OpCode::Constant, &[zero])
        .emit(OpCode::DefineLocal, &[0])
        .emit(OpCode::Closure, &[inner])
        .emit(OpCode::Return, &[1]);
    asm.function(maker.build())
}

/// `make_counter` stored in global 0, nothing called yet.
pub fn make_counter_script() -> Bytecode {
    script(|asm, main| {
        let maker = make_counter_fn(asm);
        main.emit(OpCode::Constant, &[maker])
            .emit(OpCode::SetGlobal, &[MAKE_COUNTER]);
    })
}
