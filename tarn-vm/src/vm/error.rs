// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime faults raised by the VM and the invocation layer.
//!
//! Faults abort the current run. Script-level errors are ordinary
//! [`Value::Error`](crate::Value::Error) values and never appear here.

use std::fmt;

/// Argument counts accepted by a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Exact(n) => argc == n,
            Arity::AtLeast(n) => argc >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "want={n}"),
            Arity::AtLeast(n) => write!(f, "want>={n}"),
        }
    }
}

/// Runtime fault during VM execution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("object allocation limit exceeded")]
    ObjectAllocLimit,

    #[error("index out of bounds: index {index}, length {length}")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("invalid index type: {receiver}[{key}]")]
    InvalidIndexType {
        receiver: &'static str,
        key: &'static str,
    },

    #[error("invalid index on error")]
    InvalidIndexOnError,

    #[error("not indexable: {0}")]
    NotIndexable(&'static str),

    #[error("not index-assignable: {0}")]
    NotIndexAssignable(&'static str),

    #[error("invalid slice index: {low} > {high}")]
    InvalidSliceIndex { low: i64, high: i64 },

    #[error("invalid operator: {}", describe_operator(.op, .left, .right))]
    InvalidOperator {
        op: &'static str,
        left: &'static str,
        right: Option<&'static str>,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("not callable: {0}")]
    NotCallable(&'static str),

    #[error("wrong number of arguments: {want}, got={got}")]
    WrongNumArguments { want: Arity, got: usize },

    #[error("invalid type for argument '{name}': expected {expected}, found {found}")]
    InvalidArgumentType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("global index {index} out of range (length {length})")]
    GlobalOutOfRange { index: usize, length: usize },

    #[error("constant index {index} out of range (length {length})")]
    ConstantOutOfRange { index: usize, length: usize },

    #[error("invalid opcode: {0}")]
    InvalidOpcode(u8),

    #[error("invalid execution context")]
    InvalidExecutionContext,

    #[error(
        "function '{function}' requires {missing} for execution{}",
        .suggestion.as_ref().map(|s| format!(" - {s}")).unwrap_or_default()
    )]
    MissingExecutionContext {
        function: String,
        missing: String,
        suggestion: Option<String>,
    },

    #[error(
        "invalid constants array{}: {reason}",
        .index.map(|i| format!(" at index {i}")).unwrap_or_default()
    )]
    InvalidConstantsArray { reason: String, index: Option<usize> },

    #[error(
        "invalid globals array{}: {reason}",
        .index.map(|i| format!(" at index {i}")).unwrap_or_default()
    )]
    InvalidGlobalsArray { reason: String, index: Option<usize> },

    #[error("internal error: {0}")]
    Internal(String),
}

fn describe_operator(op: &str, left: &str, right: &Option<&'static str>) -> String {
    match right {
        Some(right) => format!("{left} {op} {right}"),
        None => format!("{op}{left}"),
    }
}

impl RuntimeError {
    /// A required piece of execution state was not supplied.
    pub fn missing(
        function: impl Into<String>,
        missing: impl Into<String>,
        suggestion: Option<&str>,
    ) -> Self {
        RuntimeError::MissingExecutionContext {
            function: function.into(),
            missing: missing.into(),
            suggestion: suggestion.map(str::to_string),
        }
    }

    pub fn binary_operator(op: &'static str, left: &'static str, right: &'static str) -> Self {
        RuntimeError::InvalidOperator {
            op,
            left,
            right: Some(right),
        }
    }

    pub fn unary_operator(op: &'static str, operand: &'static str) -> Self {
        RuntimeError::InvalidOperator {
            op,
            left: operand,
            right: None,
        }
    }
}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
