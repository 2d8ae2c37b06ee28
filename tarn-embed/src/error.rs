// tarn-embed - Embedding API for the Tarn virtual machine
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Errors raised by the embedding layer.

use tarn_vm::RuntimeError;

/// Error type for [`Program`](crate::Program) operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// No global is registered under this name.
    #[error("unknown global: {0}")]
    UnknownGlobal(String),

    /// A fault from the VM or the invocation layer.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, Error>;
