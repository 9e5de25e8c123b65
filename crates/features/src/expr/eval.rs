//! Tree-walking evaluator.
//!
//! Runtime failures are reported as plain messages; [`super::Expression`]
//! attaches the expression source when it wraps them in [`crate::Error`].

use super::parser::{BinaryOp, Expr, UnaryOp};
use crate::value::Value;
use std::cmp::Ordering;

type EvalResult = std::result::Result<Value, String>;

pub(crate) fn eval(expr: &Expr, ctx: &Value) -> EvalResult {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => Ok(ctx.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Member(object, field) => {
            let object = eval(object, ctx)?;
            Ok(object.get(field).cloned().unwrap_or(Value::Null))
        }
        Expr::Index(object, index) => {
            let object = eval(object, ctx)?;
            let index = eval(index, ctx)?;
            index_value(&object, &index)
        }
        Expr::Array(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Expr::Unary(op, operand) => {
            let operand = eval(operand, ctx)?;
            unary(*op, &operand)
        }
        Expr::And(lhs, rhs) => {
            if !truthy(&eval(lhs, ctx)?, "&&")? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&eval(rhs, ctx)?, "&&")?))
        }
        Expr::Or(lhs, rhs) => {
            if truthy(&eval(lhs, ctx)?, "||")? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&eval(rhs, ctx)?, "||")?))
        }
        Expr::Coalesce(lhs, rhs) => {
            let value = eval(lhs, ctx)?;
            if value.is_null() {
                eval(rhs, ctx)
            } else {
                Ok(value)
            }
        }
        Expr::Conditional(cond, then, otherwise) => {
            if truthy(&eval(cond, ctx)?, "?:")? {
                eval(then, ctx)
            } else {
                eval(otherwise, ctx)
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, ctx)?;
            let rhs = eval(rhs, ctx)?;
            binary(*op, &lhs, &rhs)
        }
    }
}

fn truthy(value: &Value, op: &str) -> Result<bool, String> {
    value
        .truthy()
        .ok_or_else(|| format!("operator '{op}' expects bool operands, got {}", value.kind()))
}

fn index_value(object: &Value, index: &Value) -> EvalResult {
    match (object, index) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::Sequence(items), Value::Int(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Mapping(map), Value::String(key)) => {
            Ok(map.get(key).cloned().unwrap_or(Value::Null))
        }
        (object, index) => Err(format!(
            "cannot index {} with {}",
            object.kind(),
            index.kind()
        )),
    }
}

fn unary(op: UnaryOp, operand: &Value) -> EvalResult {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!truthy(operand, "!")?)),
        UnaryOp::Neg => match operand {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            Value::Float(x) => Ok(Value::Float(-x)),
            other => Err(format!("cannot negate {}", other.kind())),
        },
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::NotEq => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(lhs, rhs)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::In => contains(rhs, lhs).map(Value::Bool),
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => arithmetic(op, lhs, rhs),
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Result<Ordering, String> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a
                .partial_cmp(&b)
                .ok_or_else(|| "cannot compare NaN".to_string()),
            _ => Err(format!("cannot compare {} and {}", lhs.kind(), rhs.kind())),
        },
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, String> {
    match haystack {
        Value::Null => Ok(false),
        Value::Sequence(items) => Ok(items.iter().any(|item| item == needle)),
        Value::Mapping(map) => match needle {
            Value::String(key) => Ok(map.contains_key(key)),
            other => Err(format!("mapping keys are strings, got {}", other.kind())),
        },
        Value::String(s) => match needle {
            Value::String(sub) => Ok(s.contains(sub.as_str())),
            other => Err(format!("cannot search string for {}", other.kind())),
        },
        other => Err(format!("operator 'in' not supported on {}", other.kind())),
    }
}

fn add(lhs: &Value, rhs: &Value) -> EvalResult {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (Value::Sequence(a), Value::Sequence(b)) => {
            Ok(Value::Sequence(a.iter().chain(b).cloned().collect()))
        }
        _ => arithmetic(BinaryOp::Add, lhs, rhs),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult {
    // Division always yields a float
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs)
        && op != BinaryOp::Div
    {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            _ if *b == 0 => return Err("modulo by zero".to_string()),
            _ => a.checked_rem(*b),
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| "integer overflow".to_string());
    }

    let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
        return Err(format!(
            "invalid operands for arithmetic: {} and {}",
            lhs.kind(),
            rhs.kind()
        ));
    };

    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div if b == 0.0 => Err("division by zero".to_string()),
        BinaryOp::Div => Ok(Value::Float(a / b)),
        BinaryOp::Rem => Err("modulo requires integer operands".to_string()),
        _ => Err("unsupported arithmetic operator".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        assert_eq!(
            arithmetic(BinaryOp::Mul, &Value::Int(3), &Value::Int(4)).unwrap(),
            Value::Int(12)
        );
        assert_eq!(
            arithmetic(BinaryOp::Div, &Value::Int(7), &Value::Int(2)).unwrap(),
            Value::Float(3.5)
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert!(arithmetic(BinaryOp::Div, &Value::Int(1), &Value::Int(0)).is_err());
        assert!(arithmetic(BinaryOp::Rem, &Value::Int(1), &Value::Int(0)).is_err());
    }

    #[test]
    fn test_compare_mixed_numbers() {
        assert_eq!(
            compare(&Value::Int(2), &Value::Float(2.5)).unwrap(),
            Ordering::Less
        );
        assert!(compare(&Value::Int(2), &Value::from("2")).is_err());
    }

    #[test]
    fn test_contains_variants() {
        let seq = Value::Sequence(vec!["a".into(), "b".into()]);
        assert!(contains(&seq, &"a".into()).unwrap());
        assert!(!contains(&Value::Null, &"a".into()).unwrap());
        assert!(contains(&Value::from("openebs"), &"ebs".into()).unwrap());
    }
}
