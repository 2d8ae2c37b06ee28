// tarn-embed - Embedding API for the Tarn virtual machine
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # tarn-embed
//!
//! Host-side API for running Tarn bytecode and calling the functions it
//! produces.
//!
//! - [`Program`] runs a compiled unit and exposes its globals by name.
//! - [`Context`] calls compiled functions and closures outside the run that
//!   created them, over shared or isolated globals.
//! - [`IntoValue`] and [`FromValue`] convert between Rust types and [`Value`].
//!
//! ## Calling a closure from the host
//!
//! ```rust
//! use tarn_embed::{Program, Value};
//! use tarn_vm::{Assembler, FreeVar, FunctionBuilder, OpCode};
//!
//! // make_counter := func() { count := 0; return func() { count += 1; return count } }
//! // counter := make_counter()
//! let mut asm = Assembler::new();
//! let zero = asm.constant(0);
//! let one = asm.constant(1);
//! let mut inner = FunctionBuilder::new().free(FreeVar::Local(0));
//! inner
//!     .emit(OpCode::GetFree, &[0])
//!     .emit(OpCode::Constant, &[one])
//!     .emit(OpCode::Add, &[])
//!     .emit(OpCode::SetFree, &[0])
//!     .emit(OpCode::GetFree, &[0])
//!     .emit(OpCode::Return, &[1]);
//! let inner = asm.function(inner.build());
//! let mut maker = FunctionBuilder::new().locals(1);
//! maker
//!     .emit(OpCode::Constant, &[zero])
//!     .emit(OpCode::DefineLocal, &[0])
//!     .emit(OpCode::Closure, &[inner])
//!     .emit(OpCode::Return, &[1]);
//! let maker = asm.function(maker.build());
//! let mut main = FunctionBuilder::new();
//! main.emit(OpCode::Constant, &[maker])
//!     .emit(OpCode::Call, &[0, 0])
//!     .emit(OpCode::SetGlobal, &[0])
//!     .emit(OpCode::Halt, &[]);
//!
//! let program = Program::new(asm.finish(main.build()), ["counter"]);
//! program.run().unwrap();
//!
//! let ctx = program.context().unwrap();
//! let counter = program.get("counter").unwrap();
//! assert_eq!(ctx.call(&counter, &[]).unwrap(), Value::Int(1));
//! assert_eq!(ctx.call(&counter, &[]).unwrap(), Value::Int(2));
//! ```

mod context;
mod convert;
mod error;
mod globals;
mod program;

pub use context::Context;
pub use convert::{FromValue, IntoValue, from_value, to_value};
pub use error::{Error, Result};
pub use globals::Globals;
pub use program::Program;

// Re-export core types for convenience
pub use tarn_vm::{BuiltinFunction, Bytecode, CompiledFunction, Constants, RuntimeError, Value, VmConfig};
