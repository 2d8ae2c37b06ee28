// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Host-implemented functions callable from bytecode.
//!
//! The VM ships a small core table addressed by `GetBuiltin`. Hosts add their
//! own functions as [`Value::BuiltinFunction`] values in globals.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::value::Value;
use crate::vm::{Arity, Result, RuntimeError};

/// Signature of a host function.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A named host function.
pub struct BuiltinFunction {
    name: String,
    func: Arc<NativeFn>,
}

impl BuiltinFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl From<BuiltinFunction> for Value {
    fn from(b: BuiltinFunction) -> Self {
        Value::BuiltinFunction(Arc::new(b))
    }
}

static BUILTINS: OnceLock<Vec<Arc<BuiltinFunction>>> = OnceLock::new();

/// The core builtin table. `GetBuiltin n` pushes entry `n`.
pub fn builtins() -> &'static [Arc<BuiltinFunction>] {
    BUILTINS.get_or_init(|| {
        vec![
            Arc::new(BuiltinFunction::new("len", builtin_len)),
            Arc::new(BuiltinFunction::new("append", builtin_append)),
            Arc::new(BuiltinFunction::new("copy", builtin_copy)),
            Arc::new(BuiltinFunction::new("string", builtin_string)),
            Arc::new(BuiltinFunction::new("int", builtin_int)),
            Arc::new(BuiltinFunction::new("type_name", builtin_type_name)),
            Arc::new(BuiltinFunction::new("is_error", builtin_is_error)),
        ]
    })
}

/// Index of the builtin called `name`.
pub fn builtin_index(name: &str) -> Option<usize> {
    builtins().iter().position(|b| b.name() == name)
}

fn expect_args(args: &[Value], want: usize) -> Result<()> {
    if args.len() != want {
        return Err(RuntimeError::WrongNumArguments {
            want: Arity::Exact(want),
            got: args.len(),
        });
    }
    Ok(())
}

fn builtin_len(args: &[Value]) -> Result<Value> {
    expect_args(args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.read().len(),
        Value::Map(map) => map.read().len(),
        other => {
            return Err(RuntimeError::InvalidArgumentType {
                name: "first".into(),
                expected: "array/string/map",
                found: other.type_name(),
            });
        }
    };
    Ok(Value::Int(n as i64))
}

fn builtin_append(args: &[Value]) -> Result<Value> {
    let Some((target, rest)) = args.split_first() else {
        return Err(RuntimeError::WrongNumArguments {
            want: Arity::AtLeast(1),
            got: 0,
        });
    };
    match target {
        Value::Undefined => Ok(Value::array(rest.to_vec())),
        Value::Array(items) => {
            let mut out = items.read().clone();
            out.extend_from_slice(rest);
            Ok(Value::array(out))
        }
        other => Err(RuntimeError::InvalidArgumentType {
            name: "first".into(),
            expected: "array",
            found: other.type_name(),
        }),
    }
}

fn builtin_copy(args: &[Value]) -> Result<Value> {
    expect_args(args, 1)?;
    Ok(args[0].deep_copy())
}

fn builtin_string(args: &[Value]) -> Result<Value> {
    expect_args(args, 1)?;
    match &args[0] {
        Value::Undefined => Ok(Value::Undefined),
        Value::String(_) => Ok(args[0].clone()),
        other => Ok(Value::string(other.to_text())),
    }
}

fn builtin_int(args: &[Value]) -> Result<Value> {
    expect_args(args, 1)?;
    Ok(match &args[0] {
        Value::Int(n) => Value::Int(*n),
        Value::Float(x) => Value::Int(*x as i64),
        Value::Bool(b) => Value::Int(*b as i64),
        Value::String(s) => s.trim().parse::<i64>().map(Value::Int).unwrap_or_default(),
        _ => Value::Undefined,
    })
}

fn builtin_type_name(args: &[Value]) -> Result<Value> {
    expect_args(args, 1)?;
    Ok(Value::string(args[0].type_name()))
}

fn builtin_is_error(args: &[Value]) -> Result<Value> {
    expect_args(args, 1)?;
    Ok(Value::Bool(args[0].is_error()))
}
