// tarn-vm - Bytecode virtual machine for the Tarn scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Arithmetic, bitwise and ordering opcode handlers.

use std::cmp::Ordering;

use crate::opcode::OpCode;
use crate::value::Value;
use crate::vm::{Result, RuntimeError, VM};

impl VM {
    /// Execute an arithmetic, bitwise, comparison or unary opcode.
    pub(crate) fn execute_arithmetic(&mut self, op: OpCode) -> Result<()> {
        match op {
            OpCode::Minus | OpCode::BComplement => {
                let operand = self.stack.pop()?;
                let result = unary_op(op, &operand)?;
                self.alloc()?;
                self.stack.push(result)
            }
            OpCode::Less | OpCode::LessEq | OpCode::Greater | OpCode::GreaterEq => {
                let right = self.stack.pop()?;
                let left = self.stack.pop()?;
                let result = compare_op(op, &left, &right)?;
                self.stack.push(Value::Bool(result))
            }
            _ => {
                let right = self.stack.pop()?;
                let left = self.stack.pop()?;
                let result = binary_op(op, &left, &right)?;
                self.alloc()?;
                self.stack.push(result)
            }
        }
    }
}

/// Source-level spelling of an operator, for error messages.
pub(crate) fn symbol(op: OpCode) -> &'static str {
    match op {
        OpCode::Add => "+",
        OpCode::Sub | OpCode::Minus => "-",
        OpCode::Mul => "*",
        OpCode::Div => "/",
        OpCode::Rem => "%",
        OpCode::BitAnd => "&",
        OpCode::BitOr => "|",
        OpCode::BitXor | OpCode::BComplement => "^",
        OpCode::BitAndNot => "&^",
        OpCode::Shl => "<<",
        OpCode::Shr => ">>",
        OpCode::Less => "<",
        OpCode::LessEq => "<=",
        OpCode::Greater => ">",
        OpCode::GreaterEq => ">=",
        _ => "?",
    }
}

/// Apply a binary arithmetic or bitwise operator.
pub fn binary_op(op: OpCode, left: &Value, right: &Value) -> Result<Value> {
    let invalid = || RuntimeError::binary_operator(symbol(op), left.type_name(), right.type_name());
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(op, *a, *b).ok_or_else(invalid)?,
        (Value::Int(a), Value::Float(b)) => float_op(op, *a as f64, *b).ok_or_else(invalid),
        (Value::Float(a), Value::Int(b)) => float_op(op, *a, *b as f64).ok_or_else(invalid),
        (Value::Float(a), Value::Float(b)) => float_op(op, *a, *b).ok_or_else(invalid),
        (Value::String(a), b) if op == OpCode::Add => {
            let mut s = String::with_capacity(a.len());
            s.push_str(a);
            s.push_str(&b.to_text());
            Ok(Value::string(s))
        }
        (Value::Array(a), Value::Array(b)) if op == OpCode::Add => {
            let mut items = a.read().clone();
            items.extend(b.read().iter().cloned());
            Ok(Value::array(items))
        }
        _ => Err(invalid()),
    }
}

/// Integer arithmetic wraps on overflow. `None` means the operator does not
/// apply to integers.
fn int_op(op: OpCode, a: i64, b: i64) -> Option<Result<Value>> {
    let n = match op {
        OpCode::Add => a.wrapping_add(b),
        OpCode::Sub => a.wrapping_sub(b),
        OpCode::Mul => a.wrapping_mul(b),
        OpCode::Div => {
            if b == 0 {
                return Some(Err(RuntimeError::DivisionByZero));
            }
            a.wrapping_div(b)
        }
        OpCode::Rem => {
            if b == 0 {
                return Some(Err(RuntimeError::DivisionByZero));
            }
            a.wrapping_rem(b)
        }
        OpCode::BitAnd => a & b,
        OpCode::BitOr => a | b,
        OpCode::BitXor => a ^ b,
        OpCode::BitAndNot => a & !b,
        OpCode::Shl | OpCode::Shr if b < 0 => {
            return Some(Err(RuntimeError::binary_operator(symbol(op), "int", "negative int")));
        }
        OpCode::Shl if b >= 64 => 0,
        OpCode::Shl => a << b,
        OpCode::Shr if b >= 64 => {
            if a < 0 {
                -1
            } else {
                0
            }
        }
        OpCode::Shr => a >> b,
        _ => return None,
    };
    Some(Ok(Value::Int(n)))
}

fn float_op(op: OpCode, a: f64, b: f64) -> Option<Value> {
    let x = match op {
        OpCode::Add => a + b,
        OpCode::Sub => a - b,
        OpCode::Mul => a * b,
        OpCode::Div => a / b,
        _ => return None,
    };
    Some(Value::Float(x))
}

/// Evaluate an ordering operator over numbers or strings.
pub fn compare_op(op: OpCode, left: &Value, right: &Value) -> Result<bool> {
    let ordering = left.compare(right);
    let invalid = || RuntimeError::binary_operator(symbol(op), left.type_name(), right.type_name());
    if ordering.is_none() && !is_number_pair(left, right) {
        return Err(invalid());
    }
    // NaN compares false against everything
    Ok(match (op, ordering) {
        (_, None) => false,
        (OpCode::Less, Some(o)) => o == Ordering::Less,
        (OpCode::LessEq, Some(o)) => o != Ordering::Greater,
        (OpCode::Greater, Some(o)) => o == Ordering::Greater,
        (OpCode::GreaterEq, Some(o)) => o != Ordering::Less,
        _ => return Err(invalid()),
    })
}

fn is_number_pair(left: &Value, right: &Value) -> bool {
    matches!(left, Value::Int(_) | Value::Float(_)) && matches!(right, Value::Int(_) | Value::Float(_))
}

/// Apply a unary operator.
pub fn unary_op(op: OpCode, operand: &Value) -> Result<Value> {
    match (op, operand) {
        (OpCode::Minus, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (OpCode::Minus, Value::Float(x)) => Ok(Value::Float(-x)),
        (OpCode::BComplement, Value::Int(n)) => Ok(Value::Int(!n)),
        _ => Err(RuntimeError::unary_operator(symbol(op), operand.type_name())),
    }
}
