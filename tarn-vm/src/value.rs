// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime values.
//!
//! Scalars are immutable. `Array` and `Map` are shared mutable containers:
//! cloning a [`Value`] clones the handle, so both clones observe writes made
//! through either. [`Value::deep_copy`] produces fresh containers.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::builtins::BuiltinFunction;
use crate::bytecode::CompiledFunction;

/// Shared handle to a mutable array.
pub type Array = Arc<RwLock<Vec<Value>>>;

/// Shared handle to a mutable string-keyed map.
pub type Map = Arc<RwLock<BTreeMap<String, Value>>>;

/// A Tarn runtime value.
///
/// Equality, `Display` and [`deep_copy`](Value::deep_copy) walk containers
/// recursively with no cycle detection. A container that holds itself (for
/// example after `a[0] = a`) overflows the native stack under any of them,
/// except when compared with a handle to the same container, which
/// short-circuits on identity.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Array(Array),
    Map(Map),
    /// Script-level error wrapping an arbitrary payload.
    Error(Arc<Value>),
    CompiledFunction(Arc<CompiledFunction>),
    BuiltinFunction(Arc<BuiltinFunction>),
}

impl Value {
    /// Create a string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Create an array value from its elements.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(RwLock::new(items)))
    }

    /// Create a map value from key/value pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Map(Arc::new(RwLock::new(map)))
    }

    /// Wrap a payload in a script-level error.
    pub fn error(payload: Value) -> Self {
        Value::Error(Arc::new(payload))
    }

    /// Wrap a compiled function.
    pub fn function(func: CompiledFunction) -> Self {
        Value::CompiledFunction(Arc::new(func))
    }

    /// The name of this value's type as seen by scripts.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Error(_) => "error",
            Value::CompiledFunction(_) => "compiled-function",
            Value::BuiltinFunction(_) => "builtin-function",
        }
    }

    /// Falsiness as used by conditional jumps and `!`.
    ///
    /// Zero, NaN, empty strings and containers, `undefined`, `false` and every
    /// error are falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Undefined | Value::Error(_) => true,
            Value::Bool(b) => !b,
            Value::Int(n) => *n == 0,
            Value::Float(f) => f.is_nan(),
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.read().is_empty(),
            Value::Map(map) => map.read().is_empty(),
            Value::CompiledFunction(_) | Value::BuiltinFunction(_) => false,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Recursively copy containers so the result shares no mutable state with
    /// `self`.
    ///
    /// Functions are copied by reference: a copied closure keeps sharing its
    /// captured cells.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Array(items) => Value::array(items.read().iter().map(Value::deep_copy).collect()),
            Value::Map(map) => {
                let copied: BTreeMap<String, Value> = map
                    .read()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_copy()))
                    .collect();
                Value::Map(Arc::new(RwLock::new(copied)))
            }
            Value::Error(payload) => Value::error(payload.deep_copy()),
            other => other.clone(),
        }
    }

    /// Ordering for numbers (with int/float promotion) and strings.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Text used when a value is concatenated onto a string: strings are
    /// unquoted, everything else uses its display form.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || *a.read() == *b.read(),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b) || *a.read() == *b.read(),
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::CompiledFunction(a), Value::CompiledFunction(b)) => Arc::ptr_eq(a, b),
            (Value::BuiltinFunction(a), Value::BuiltinFunction(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "<undefined>"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.read().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.read().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Error(payload) => write!(f, "error: {payload}"),
            Value::CompiledFunction(_) => write!(f, "<compiled-function>"),
            Value::BuiltinFunction(b) => write!(f, "<builtin-function:{}>", b.name()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}
