// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Container opcode handlers: construction, indexing, slicing and assignment.

use std::collections::BTreeMap;

use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::{Result, RuntimeError, VM};

impl VM {
    /// Execute a container opcode.
    pub(crate) fn execute_collections(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::Array => {
                let count = self.read_u16()? as usize;
                let items = self.stack.pop_n(count)?;
                self.alloc()?;
                self.stack.push(Value::array(items))
            }
            OpCode::Map => {
                let pairs = self.read_u16()? as usize;
                let flat = self.stack.pop_n(pairs * 2)?;
                let mut map = BTreeMap::new();
                let mut iter = flat.into_iter();
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    match key {
                        Value::String(k) => {
                            map.insert(k.to_string(), value);
                        }
                        other => {
                            return Err(RuntimeError::InvalidIndexType {
                                receiver: "map",
                                key: other.type_name(),
                            });
                        }
                    }
                }
                self.alloc()?;
                self.stack.push(Value::map(map))
            }
            OpCode::Error => {
                let payload = self.stack.pop()?;
                self.alloc()?;
                self.stack.push(Value::error(payload))
            }
            OpCode::Index => {
                let key = self.stack.pop()?;
                let receiver = self.stack.pop()?;
                let value = index_get(&receiver, &key)?;
                self.stack.push(value)
            }
            OpCode::SliceIndex => {
                let high = self.stack.pop()?;
                let low = self.stack.pop()?;
                let receiver = self.stack.pop()?;
                let value = slice(&receiver, &low, &high)?;
                self.alloc()?;
                self.stack.push(value)
            }
            OpCode::SetIndex => {
                let value = self.stack.pop()?;
                let key = self.stack.pop()?;
                let receiver = self.stack.pop()?;
                index_set(&receiver, &key, value)
            }
            _ => Err(RuntimeError::Internal(format!(
                "execute_collections: unexpected opcode {op:?}"
            ))),
        }
    }
}

/// `receiver[key]`. Missing elements read as `undefined`.
pub fn index_get(receiver: &Value, key: &Value) -> Result<Value> {
    match (receiver, key) {
        (Value::Array(items), Value::Int(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| items.read().get(i).cloned())
            .unwrap_or_default()),
        (Value::Map(map), Value::String(k)) => {
            Ok(map.read().get(&**k).cloned().unwrap_or_default())
        }
        (Value::String(s), Value::Int(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::string(c.to_string()))
            .unwrap_or_default()),
        (Value::Error(payload), Value::String(k)) if &**k == "value" => Ok((**payload).clone()),
        (Value::Error(_), _) => Err(RuntimeError::InvalidIndexOnError),
        (Value::Array(_) | Value::Map(_) | Value::String(_), key) => {
            Err(RuntimeError::InvalidIndexType {
                receiver: receiver.type_name(),
                key: key.type_name(),
            })
        }
        (Value::Undefined, _) => Ok(Value::Undefined),
        (other, _) => Err(RuntimeError::NotIndexable(other.type_name())),
    }
}

/// `receiver[key] = value`.
pub fn index_set(receiver: &Value, key: &Value, value: Value) -> Result<()> {
    match (receiver, key) {
        (Value::Array(items), Value::Int(i)) => {
            let mut items = items.write();
            let length = items.len();
            match usize::try_from(*i) {
                Ok(idx) if idx < length => {
                    items[idx] = value;
                    Ok(())
                }
                _ => Err(RuntimeError::IndexOutOfBounds { index: *i, length }),
            }
        }
        (Value::Map(map), Value::String(k)) => {
            map.write().insert(k.to_string(), value);
            Ok(())
        }
        (Value::Array(_) | Value::Map(_), key) => Err(RuntimeError::InvalidIndexType {
            receiver: receiver.type_name(),
            key: key.type_name(),
        }),
        (other, _) => Err(RuntimeError::NotIndexAssignable(other.type_name())),
    }
}

/// `receiver[low:high]` over arrays and strings. Bounds are clamped to the
/// receiver; `undefined` bounds are open.
pub fn slice(receiver: &Value, low: &Value, high: &Value) -> Result<Value> {
    let length = match receiver {
        Value::Array(items) => items.read().len(),
        Value::String(s) => s.chars().count(),
        other => return Err(RuntimeError::NotIndexable(other.type_name())),
    };
    let low = slice_bound(receiver, low, 0, length)?;
    let high = slice_bound(receiver, high, length, length)?;
    if low > high {
        return Err(RuntimeError::InvalidSliceIndex {
            low: low as i64,
            high: high as i64,
        });
    }
    Ok(match receiver {
        Value::Array(items) => Value::array(items.read()[low..high].to_vec()),
        Value::String(s) => Value::string(s.chars().skip(low).take(high - low).collect::<String>()),
        _ => Value::Undefined,
    })
}

fn slice_bound(receiver: &Value, bound: &Value, default: usize, length: usize) -> Result<usize> {
    match bound {
        Value::Undefined => Ok(default),
        Value::Int(i) if *i < 0 => Ok(0),
        Value::Int(i) => Ok(usize::try_from(*i).unwrap_or(length).min(length)),
        other => Err(RuntimeError::InvalidIndexType {
            receiver: receiver.type_name(),
            key: other.type_name(),
        }),
    }
}
