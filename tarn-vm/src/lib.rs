// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based bytecode virtual machine for Tarn.
//!
//! The front end (lexer, parser, compiler) lives elsewhere and hands this crate a
//! finished [`Bytecode`] unit. The VM executes its top-level function, producing
//! globals and first-class function values. Compiled functions, closures
//! included, can later be re-entered from the host through
//! [`CompiledFunction::call_with_globals_and_constants`].
//!
//! The [`asm`] module offers a small assembler for hosts and tests that need to
//! produce bytecode without a compiler.

pub mod asm;
pub mod builtins;
pub mod bytecode;
pub mod config;
pub mod opcode;
pub mod value;
pub mod vm;

pub use asm::{Assembler, FunctionBuilder};
pub use builtins::{BuiltinFunction, NativeFn};
pub use bytecode::{Bytecode, Cell, CompiledFunction, Constants, FreeVar};
pub use config::{ConfigError, VmConfig};
pub use opcode::OpCode;
pub use value::Value;
pub use vm::{Arity, Result, RuntimeError, VM, run, validate_constants};
