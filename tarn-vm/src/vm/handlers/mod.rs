// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Opcode handlers, grouped by instruction class.

pub mod arithmetic;
pub mod closures;
pub mod collections;
pub mod control;
pub mod variables;
