// tarn-vm - Runtime fault tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

mod common;

use common::*;
use tarn_vm::Arity;

fn binary(op: OpCode, left: Value, right: Value) -> Bytecode {
    script(|asm, main| {
        let l = asm.constant(left);
        let r = asm.constant(right);
        main.emit(OpCode::Constant, &[l])
            .emit(OpCode::Constant, &[r])
            .emit(op, &[]);
    })
}

// =============================================================================
// Operator faults
// =============================================================================

#[test]
fn test_division_by_zero() {
    let err = run_script_err(&binary(OpCode::Div, Value::Int(1), Value::Int(0)), 0);
    assert_eq!(err, RuntimeError::DivisionByZero);
    let err = run_script_err(&binary(OpCode::Rem, Value::Int(1), Value::Int(0)), 0);
    assert_eq!(err, RuntimeError::DivisionByZero);
}

#[test]
fn test_invalid_operand_types() {
    let err = run_script_err(&binary(OpCode::Add, Value::Int(1), Value::Bool(true)), 0);
    assert_eq!(err.to_string(), "invalid operator: int + bool");
    let err = run_script_err(&binary(OpCode::Less, Value::string("a"), Value::Int(1)), 0);
    assert!(matches!(err, RuntimeError::InvalidOperator { op: "<", .. }));
}

#[test]
fn test_unary_minus_on_string() {
    let bc = script(|asm, main| {
        let s = asm.constant("s");
        main.emit(OpCode::Constant, &[s]).emit(OpCode::Minus, &[]);
    });
    assert_eq!(run_script_err(&bc, 0).to_string(), "invalid operator: -string");
}

// =============================================================================
// Call faults
// =============================================================================

#[test]
fn test_calling_a_non_function() {
    let bc = script(|asm, main| {
        let five = asm.constant(5);
        main.emit(OpCode::Constant, &[five]).emit(OpCode::Call, &[0, 0]);
    });
    assert_eq!(run_script_err(&bc, 0), RuntimeError::NotCallable("int"));
}

#[test]
fn test_wrong_argument_count_in_script() {
    let bc = script(|asm, main| {
        let mut f = FunctionBuilder::new().params(1);
        f.emit(OpCode::GetLocal, &[0]).emit(OpCode::Return, &[1]);
        let f = asm.function(f.build());
        main.emit(OpCode::Constant, &[f]).emit(OpCode::Call, &[0, 0]);
    });
    let err = run_script_err(&bc, 0);
    assert_eq!(
        err,
        RuntimeError::WrongNumArguments {
            want: Arity::Exact(1),
            got: 0,
        }
    );
    assert_eq!(err.to_string(), "wrong number of arguments: want=1, got=0");
}

#[test]
fn test_varargs_minimum() {
    let bc = script(|asm, main| {
        let mut f = FunctionBuilder::new().params(3).varargs();
        f.emit(OpCode::Return, &[0]);
        let f = asm.function(f.build());
        let one = asm.constant(1);
        main.emit(OpCode::Constant, &[f])
            .emit(OpCode::Constant, &[one])
            .emit(OpCode::Call, &[1, 0]);
    });
    assert_eq!(
        run_script_err(&bc, 0).to_string(),
        "wrong number of arguments: want>=2, got=1"
    );
}

#[test]
fn test_spread_of_non_array() {
    let bc = script(|asm, main| {
        let mut f = FunctionBuilder::new().params(1);
        f.emit(OpCode::Return, &[0]);
        let f = asm.function(f.build());
        let one = asm.constant(1);
        main.emit(OpCode::Constant, &[f])
            .emit(OpCode::Constant, &[one])
            .emit(OpCode::Call, &[1, 1]);
    });
    assert!(matches!(
        run_script_err(&bc, 0),
        RuntimeError::InvalidArgumentType { found: "int", .. }
    ));
}

#[test]
fn test_builtin_fault_propagates() {
    let bc = script(|asm, main| {
        let n = asm.constant(3);
        let len = tarn_vm::builtins::builtin_index("len").unwrap();
        main.emit(OpCode::GetBuiltin, &[len])
            .emit(OpCode::Constant, &[n])
            .emit(OpCode::Call, &[1, 0]);
    });
    assert!(matches!(
        run_script_err(&bc, 0),
        RuntimeError::InvalidArgumentType { expected: "array/string/map", .. }
    ));
}

// =============================================================================
// Container faults
// =============================================================================

#[test]
fn test_set_index_out_of_bounds() {
    let bc = script(|asm, main| {
        let one = asm.constant(1);
        let five = asm.constant(5);
        main.emit(OpCode::Constant, &[one])
            .emit(OpCode::Array, &[1])
            .emit(OpCode::Constant, &[five])
            .emit(OpCode::Constant, &[one])
            .emit(OpCode::SetIndex, &[]);
    });
    assert_eq!(
        run_script_err(&bc, 0),
        RuntimeError::IndexOutOfBounds { index: 5, length: 1 }
    );
}

#[test]
fn test_error_only_exposes_value() {
    let bc = script(|asm, main| {
        let boom = asm.constant("boom");
        let other = asm.constant("message");
        main.emit(OpCode::Constant, &[boom])
            .emit(OpCode::Error, &[])
            .emit(OpCode::Constant, &[other])
            .emit(OpCode::Index, &[]);
    });
    assert_eq!(run_script_err(&bc, 0), RuntimeError::InvalidIndexOnError);
}

#[test]
fn test_int_is_not_indexable() {
    let bc = binary(OpCode::Index, Value::Int(1), Value::Int(0));
    assert_eq!(run_script_err(&bc, 0), RuntimeError::NotIndexable("int"));
}

// =============================================================================
// Malformed bytecode
// =============================================================================

#[test]
fn test_global_out_of_range() {
    let bc = script(|asm, main| {
        let one = asm.constant(1);
        main.emit(OpCode::Constant, &[one]).emit(OpCode::SetGlobal, &[3]);
    });
    assert_eq!(
        run_script_err(&bc, 1),
        RuntimeError::GlobalOutOfRange { index: 3, length: 1 }
    );
}

#[test]
fn test_constant_out_of_range() {
    let bc = script(|_, main| {
        main.emit(OpCode::Constant, &[7]);
    });
    assert_eq!(
        run_script_err(&bc, 0),
        RuntimeError::ConstantOutOfRange { index: 7, length: 0 }
    );
}

#[test]
fn test_invalid_opcode() {
    let bc = Bytecode::new(CompiledFunction::new(vec![0xFFu8], 0, 0), Vec::<Value>::new());
    assert_eq!(run_script_err(&bc, 0), RuntimeError::InvalidOpcode(0xFF));
}

// =============================================================================
// Limits
// =============================================================================

#[test]
fn test_allocation_budget_is_exact() {
    // [1]; [2]
    let bc = script(|asm, main| {
        let one = asm.constant(1);
        let two = asm.constant(2);
        main.emit(OpCode::Constant, &[one])
            .emit(OpCode::Array, &[1])
            .emit(OpCode::Pop, &[])
            .emit(OpCode::Constant, &[two])
            .emit(OpCode::Array, &[1]);
    });
    init_tracing();
    assert_eq!(
        tarn_vm::run(&bc, vec![], Some(1)).unwrap_err(),
        RuntimeError::ObjectAllocLimit
    );
    let (result, _) = tarn_vm::run(&bc, vec![], Some(2)).unwrap();
    assert_eq!(result.to_string(), "[2]");
}

#[test]
fn test_comparisons_do_not_allocate() {
    let bc = binary(OpCode::Less, Value::Int(1), Value::Int(2));
    let (result, _) = tarn_vm::run(&bc, vec![], Some(0)).unwrap();
    assert_eq!(result, Value::Bool(true));
}

/// `f := func() { return f() }; f()`
fn runaway_recursion() -> Bytecode {
    script(|asm, main| {
        let mut f = FunctionBuilder::new();
        f.emit(OpCode::GetGlobal, &[0])
            .emit(OpCode::Call, &[0, 0])
            .emit(OpCode::Return, &[1]);
        let f = asm.function(f.build());
        main.emit(OpCode::Constant, &[f]).emit(OpCode::SetGlobal, &[0]);
        call_global(main, 0, &[]);
    })
}

#[test]
fn test_runaway_recursion_overflows() {
    assert_eq!(run_script_err(&runaway_recursion(), 1), RuntimeError::StackOverflow);
}

#[test]
fn test_frame_limit_is_configurable() {
    let bc = runaway_recursion();
    let config = VmConfig::default().with_max_frames(8);
    let mut vm = tarn_vm::VM::new(&bc, vec![Value::Undefined], &config).unwrap();
    assert_eq!(vm.run(), Err(RuntimeError::StackOverflow));
    assert_eq!(vm.depth(), 8);
}

#[test]
fn test_operand_stack_limit() {
    let bc = script(|asm, main| {
        let one = asm.constant(1);
        for _ in 0..5 {
            main.emit(OpCode::Constant, &[one]);
        }
    });
    let config = VmConfig::default().with_stack_size(4);
    assert_eq!(run_with_config(&bc, 0, &config), Err(RuntimeError::StackOverflow));
}

// =============================================================================
// Fault state
// =============================================================================

#[test]
fn test_fault_leaves_partial_globals() {
    // x := 1; y := 1 / 0
    let bc = script(|asm, main| {
        let one = asm.constant(1);
        let zero = asm.constant(0);
        main.emit(OpCode::Constant, &[one])
            .emit(OpCode::SetGlobal, &[0])
            .emit(OpCode::Constant, &[one])
            .emit(OpCode::Constant, &[zero])
            .emit(OpCode::Div, &[])
            .emit(OpCode::SetGlobal, &[1]);
    });
    let mut vm = tarn_vm::VM::new(&bc, vec![Value::Undefined; 2], &VmConfig::default()).unwrap();
    assert!(vm.run().is_err());
    assert_eq!(vm.globals(), &[Value::Int(1), Value::Undefined]);
}

#[test]
fn test_script_errors_are_not_faults() {
    let bc = script(|asm, main| {
        let msg = asm.constant("Custom error message: 123");
        main.emit(OpCode::Constant, &[msg]).emit(OpCode::Error, &[]);
    });
    let (result, _) = run_script(&bc, 0);
    assert!(result.is_error());
    assert_eq!(result.to_string(), "error: \"Custom error message: 123\"");
}
