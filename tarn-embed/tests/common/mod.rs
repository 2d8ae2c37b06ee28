// tarn-embed - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Programs shared by the embedding tests, assembled by hand. Each builder
//! quotes the Tarn source it stands for.

#![allow(dead_code, unused_imports)]

pub use tarn_embed::{Context, Program, RuntimeError, Value, VmConfig};
pub use tarn_vm::{Assembler, FreeVar, FunctionBuilder, OpCode};

/// Install a test subscriber once; `RUST_LOG=tarn_embed=debug` shows calls.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Assemble a program whose main function runs `build` and then halts.
pub fn program(
    names: &[&str],
    build: impl FnOnce(&mut Assembler, &mut FunctionBuilder),
) -> Program {
    init_tracing();
    let mut asm = Assembler::new();
    let mut main = FunctionBuilder::new();
    build(&mut asm, &mut main);
    main.emit(OpCode::Halt, &[]);
    Program::new(asm.finish(main.build()), names.iter().copied())
}

/// Assemble and run a program.
pub fn run(program: Program) -> Program {
    program.run().expect("program failed");
    program
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

/// ```text
/// counter := 0
/// inc := func() { counter += 1; return counter }
/// ```
pub fn counter_program() -> Program {
    program(&["counter", "inc"], |asm, main| {
        let zero = asm.constant(0);
        let one = asm.constant(1);
        let mut inc = FunctionBuilder::new();
        inc.emit(OpCode::GetGlobal, &[0])
            .emit(OpCode::Constant, &[one])
            .emit(OpCode::Add, &[])
            .emit(OpCode::SetGlobal, &[0])
            .emit(OpCode::GetGlobal, &[0])
            .emit(OpCode::Return, &[1]);
        let inc = asm.function(inc.build());
        main.emit(OpCode::Constant, &[zero])
            .emit(OpCode::SetGlobal, &[0])
            .emit(OpCode::Constant, &[inc])
            .emit(OpCode::SetGlobal, &[1]);
    })
}

/// ```text
/// global_counter := 0
/// make_incrementer := func(step) {
///     return func() { global_counter += step; return global_counter }
/// }
/// incrementer := make_incrementer(5)
/// inline_result1 := incrementer()
/// inline_result2 := incrementer()
/// ```
pub fn incrementer_program() -> Program {
    let names = [
        "global_counter",
        "make_incrementer",
        "incrementer",
        "inline_result1",
        "inline_result2",
    ];
    program(&names, |asm, main| {
        let zero = asm.constant(0);
        let five = asm.constant(5);

        let mut step = FunctionBuilder::new().free(FreeVar::Local(0));
        step.emit(OpCode::GetGlobal, &[0])
            .emit(OpCode::GetFree, &[0])
            .emit(OpCode::Add, &[])
            .emit(OpCode::SetGlobal, &[0])
            .emit(OpCode::GetGlobal, &[0])
            .emit(OpCode::Return, &[1]);
        let step = asm.function(step.build());

        let mut maker = FunctionBuilder::new().params(1);
        maker.emit(OpCode::Closure, &[step]).emit(OpCode::Return, &[1]);
        let maker = asm.function(maker.build());

        main.emit(OpCode::Constant, &[zero])
            .emit(OpCode::SetGlobal, &[0])
            .emit(OpCode::Constant, &[maker])
            .emit(OpCode::SetGlobal, &[1]);
        call_global(main, 1, &[five]);
        main.emit(OpCode::SetGlobal, &[2]);
        for slot in [3, 4] {
            call_global(main, 2, &[]);
            main.emit(OpCode::SetGlobal, &[slot]);
        }
    })
}

/// ```text
/// make_counter := func() {
///     count := 0
///     return func() { count += 1; return count }
/// }
/// ```
pub fn make_counter_program() -> Program {
    program(&["make_counter"], |asm, main| {
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
        let maker = asm.function(maker.build());

        main.emit(OpCode::Constant, &[maker])
            .emit(OpCode::SetGlobal, &[0]);
    })
}

/// ```text
/// add := func(a, b) { return a + b }
/// sum_all := func(...xs) { total := 0; for x in xs { total += x }; return total }
/// ```
///
/// `sum_all` walks its argument with an index instead of an iterator.
pub fn arithmetic_program() -> Program {
    program(&["add", "sum_all"], |asm, main| {
        let zero = asm.constant(0);
        let one = asm.constant(1);
        let len = tarn_vm::builtins::builtin_index("len").unwrap();

        let mut add = FunctionBuilder::new().params(2);
        add.emit(OpCode::GetLocal, &[0])
            .emit(OpCode::GetLocal, &[1])
            .emit(OpCode::Add, &[])
            .emit(OpCode::Return, &[1]);
        let add = asm.function(add.build());

        // locals: 0 = xs, 1 = total, 2 = i
        let mut sum = FunctionBuilder::new().params(1).varargs().locals(3);
        sum.emit(OpCode::Constant, &[zero])
            .emit(OpCode::DefineLocal, &[1])
            .emit(OpCode::Constant, &[zero])
            .emit(OpCode::DefineLocal, &[2]);
        let top = sum.position();
        sum.emit(OpCode::GetLocal, &[2])
            .emit(OpCode::GetBuiltin, &[len])
            .emit(OpCode::GetLocal, &[0])
            .emit(OpCode::Call, &[1, 0])
            .emit(OpCode::Less, &[]);
        let exit = sum.emit_jump(OpCode::JumpFalsy);
        sum.emit(OpCode::GetLocal, &[1])
            .emit(OpCode::GetLocal, &[0])
            .emit(OpCode::GetLocal, &[2])
            .emit(OpCode::Index, &[])
            .emit(OpCode::Add, &[])
            .emit(OpCode::SetLocal, &[1])
            .emit(OpCode::GetLocal, &[2])
            .emit(OpCode::Constant, &[one])
            .emit(OpCode::Add, &[])
            .emit(OpCode::SetLocal, &[2])
            .emit(OpCode::Jump, &[top]);
        let end = sum.position();
        sum.patch_jump(exit, end);
        sum.emit(OpCode::GetLocal, &[1]).emit(OpCode::Return, &[1]);
        let sum = asm.function(sum.build());

        main.emit(OpCode::Constant, &[add])
            .emit(OpCode::SetGlobal, &[0])
            .emit(OpCode::Constant, &[sum])
            .emit(OpCode::SetGlobal, &[1]);
    })
}
