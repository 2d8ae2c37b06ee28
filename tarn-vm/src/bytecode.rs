// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode units, compiled functions and captured cells.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::opcode;
use crate::value::Value;
use crate::vm::{Arity, Result, RuntimeError};

/// The constants pool shared by every function of one compilation.
///
/// An entry holding [`Value::Undefined`] is a reserved slot the compiler never
/// filled; compilers emit `Null` for the literal instead of interning it.
pub type Constants = Arc<[Value]>;

/// How a closure obtains one of its free variables when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeVar {
    /// Capture local slot `k` of the enclosing frame, promoting it to a cell.
    Local(u8),
    /// Forward free variable `k` already held by the enclosing function.
    Free(u8),
}

/// A shared mutable box holding one captured variable.
#[derive(Debug, Clone, Default)]
pub struct Cell(Arc<RwLock<Value>>);

impl Cell {
    pub fn new(value: Value) -> Self {
        Cell(Arc::new(RwLock::new(value)))
    }

    pub fn get(&self) -> Value {
        self.0.read().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.write() = value;
    }

    /// Whether both cells are the same binding.
    pub fn ptr_eq(&self, other: &Cell) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A function compiled to bytecode.
///
/// Prototypes produced by the compiler carry `free_vars` descriptors and no
/// cells; the `Closure` instruction instantiates them with resolved cells.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub instructions: Arc<[u8]>,
    /// Local slots, parameters included.
    pub num_locals: usize,
    /// Declared parameters, the variadic one included.
    pub num_parameters: usize,
    pub varargs: bool,
    pub free_vars: Arc<[FreeVar]>,
    /// Cells captured at closure creation, in `free_vars` order.
    pub free: Vec<Cell>,
}

impl CompiledFunction {
    /// Create a non-variadic function without free variables.
    pub fn new(instructions: impl Into<Arc<[u8]>>, num_locals: usize, num_parameters: usize) -> Self {
        Self {
            instructions: instructions.into(),
            num_locals: num_locals.max(num_parameters),
            num_parameters,
            varargs: false,
            free_vars: Arc::from(Vec::new()),
            free: Vec::new(),
        }
    }

    pub fn with_varargs(mut self, varargs: bool) -> Self {
        self.varargs = varargs;
        self
    }

    pub fn with_free_vars(mut self, free_vars: Vec<FreeVar>) -> Self {
        self.free_vars = free_vars.into();
        self
    }

    /// Whether this value has been instantiated with captured cells.
    pub fn is_closure(&self) -> bool {
        !self.free.is_empty()
    }

    /// The argument counts this function accepts.
    pub fn arity(&self) -> Arity {
        if self.varargs {
            Arity::AtLeast(self.num_parameters.saturating_sub(1))
        } else {
            Arity::Exact(self.num_parameters)
        }
    }

    /// Check an argument count against the declared parameters.
    pub fn check_arity(&self, argc: usize) -> Result<()> {
        let arity = self.arity();
        if arity.accepts(argc) {
            Ok(())
        } else {
            Err(RuntimeError::WrongNumArguments { want: arity, got: argc })
        }
    }

    /// Human-readable disassembly, one instruction per line.
    pub fn disassemble(&self) -> Vec<String> {
        opcode::format_instructions(&self.instructions)
    }
}

/// A finished compilation unit: the top-level function plus the constants pool.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub main_function: Arc<CompiledFunction>,
    pub constants: Constants,
}

impl Bytecode {
    pub fn new(main_function: CompiledFunction, constants: impl Into<Constants>) -> Self {
        Self {
            main_function: Arc::new(main_function),
            constants: constants.into(),
        }
    }
}
