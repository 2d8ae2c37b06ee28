// tarn-embed - Type conversion traits
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Type conversion between Rust and Tarn values.
//!
//! This module provides the [`IntoValue`] and [`FromValue`] traits for
//! converting between Rust types and [`Value`].
//!
//! # Built-in Conversions
//!
//! | Rust Type | Tarn Type |
//! |-----------|-----------|
//! | `()` | `undefined` |
//! | `bool` | `bool` |
//! | `i32`, `i64`, `usize` | `int` |
//! | `f64` | `float` |
//! | `String`, `&str` | `string` |
//! | `Vec<T>` | `array` |
//! | `BTreeMap<String, V>`, `HashMap<String, V>` | `map` |
//! | `Option<T>` | `T` or `undefined` |
//! | `BuiltinFunction` | `builtin-function` |
//!
//! # Custom Conversions
//!
//! ```rust
//! use tarn_embed::{FromValue, IntoValue, RuntimeError, Value};
//!
//! struct Point { x: i64, y: i64 }
//!
//! impl IntoValue for Point {
//!     fn into_value(self) -> Value {
//!         Value::array(vec![Value::Int(self.x), Value::Int(self.y)])
//!     }
//! }
//!
//! impl FromValue for Point {
//!     fn from_value(val: &Value) -> tarn_vm::Result<Self> {
//!         match <Vec<i64>>::from_value(val)?.as_slice() {
//!             [x, y] => Ok(Point { x: *x, y: *y }),
//!             _ => Err(RuntimeError::InvalidArgumentType {
//!                 name: "point".into(),
//!                 expected: "array of 2 ints",
//!                 found: val.type_name(),
//!             }),
//!         }
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use tarn_vm::{BuiltinFunction, Result, RuntimeError, Value};

/// Convert a Rust type into a `Value`.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Convert a `Value` into a Rust type.
pub trait FromValue: Sized {
    fn from_value(val: &Value) -> Result<Self>;
}

fn type_error(expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::InvalidArgumentType {
        name: "value".into(),
        expected,
        found: found.type_name(),
    }
}

// ============================================================================
// IntoValue implementations
// ============================================================================

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Undefined
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self as i64)
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        Value::Int(self as i64)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl IntoValue for BuiltinFunction {
    fn into_value(self) -> Value {
        self.into()
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Undefined,
        }
    }
}

impl<V: IntoValue> IntoValue for BTreeMap<String, V> {
    fn into_value(self) -> Value {
        Value::map(self.into_iter().map(|(k, v)| (k, v.into_value())))
    }
}

impl<V: IntoValue> IntoValue for HashMap<String, V> {
    fn into_value(self) -> Value {
        Value::map(self.into_iter().map(|(k, v)| (k, v.into_value())))
    }
}

// ============================================================================
// FromValue implementations
// ============================================================================

impl FromValue for Value {
    fn from_value(val: &Value) -> Result<Self> {
        Ok(val.clone())
    }
}

impl FromValue for () {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Undefined => Ok(()),
            other => Err(type_error("undefined", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Bool(b) => Ok(*b),
            other => Err(type_error("bool", other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Int(n) => Ok(*n),
            other => Err(type_error("int", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Int(n) => i32::try_from(*n).map_err(|_| type_error("int in i32 range", val)),
            other => Err(type_error("int", other)),
        }
    }
}

impl FromValue for usize {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Int(n) => {
                usize::try_from(*n).map_err(|_| type_error("non-negative int", val))
            }
            other => Err(type_error("non-negative int", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Float(x) => Ok(*x),
            Value::Int(n) => Ok(*n as f64),
            other => Err(type_error("float", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::String(s) => Ok(s.to_string()),
            other => Err(type_error("string", other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Array(items) => items.read().iter().map(T::from_value).collect(),
            other => Err(type_error("array", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Undefined => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<V: FromValue> FromValue for BTreeMap<String, V> {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Map(map) => map
                .read()
                .iter()
                .map(|(k, v)| Ok((k.clone(), V::from_value(v)?)))
                .collect(),
            other => Err(type_error("map", other)),
        }
    }
}

impl<V: FromValue> FromValue for HashMap<String, V> {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Map(map) => map
                .read()
                .iter()
                .map(|(k, v)| Ok((k.clone(), V::from_value(v)?)))
                .collect(),
            other => Err(type_error("map", other)),
        }
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Convert a Rust value into a `Value`.
#[must_use]
pub fn to_value<T: IntoValue>(value: T) -> Value {
    value.into_value()
}

/// Convert a `Value` into a Rust type.
pub fn from_value<T: FromValue>(val: &Value) -> Result<T> {
    T::from_value(val)
}
