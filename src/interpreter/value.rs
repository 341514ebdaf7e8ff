use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::Function;
use crate::error::RuntimeErrorKind;

/// Runtime value. Maps keep `BTreeMap` so rendering and comparison are
/// deterministic. `Function` values share the definition node; they carry no
/// captured environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Time(SystemTime),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Function(Rc<Function>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Time(_) => "time",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Function(_) => "function",
        }
    }

    /// Human-readable rendering used by `echo` and the REPL-style final value
    /// print. Strings render raw, without quotes.
    pub fn render(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Str(value) => value.clone(),
            Value::Time(value) => {
                let seconds = value
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                format!("<time {seconds}>")
            }
            Value::List(items) => {
                let rendered = items
                    .iter()
                    .map(Value::render)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{rendered}]")
            }
            Value::Map(entries) => {
                let rendered = entries
                    .iter()
                    .map(|(key, value)| format!("{key} = {}", value.render()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{rendered}}}")
            }
            Value::Function(function) => format!("<function {}>", function.signature()),
        }
    }
}

/// Deep equality as `==` sees it. Ints and floats compare across the numeric
/// types; values of different supported types are unequal rather than an
/// error. Equality is keyed off the left operand: bool, time and function
/// operands are not comparable.
pub fn values_equal(left: &Value, right: &Value) -> Result<bool, RuntimeErrorKind> {
    match left {
        Value::Nil => Ok(matches!(right, Value::Nil)),
        Value::Int(l) => Ok(match right {
            Value::Int(r) => l == r,
            Value::Float(r) => (*l as f64) == *r,
            _ => false,
        }),
        Value::Float(l) => Ok(match right {
            Value::Float(r) => l == r,
            Value::Int(r) => *l == (*r as f64),
            _ => false,
        }),
        Value::Str(l) => Ok(match right {
            Value::Str(r) => l == r,
            _ => false,
        }),
        Value::List(l) => match right {
            Value::List(r) => {
                if l.len() != r.len() {
                    return Ok(false);
                }
                for (a, b) in l.iter().zip(r) {
                    if !values_equal(a, b)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        },
        Value::Map(l) => match right {
            Value::Map(r) => {
                if l.len() != r.len() {
                    return Ok(false);
                }
                for (key, a) in l {
                    match r.get(key) {
                        Some(b) if values_equal(a, b)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        },
        Value::Bool(_) | Value::Time(_) | Value::Function(_) => {
            Err(RuntimeErrorKind::UnsupportedEquality {
                type_name: left.type_name().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_across_int_and_float() {
        assert_eq!(values_equal(&Value::Int(2), &Value::Float(2.0)), Ok(true));
        assert_eq!(values_equal(&Value::Float(2.5), &Value::Int(2)), Ok(false));
    }

    #[test]
    fn mismatched_supported_types_are_unequal_not_an_error() {
        assert_eq!(
            values_equal(&Value::Int(1), &Value::Str("1".to_string())),
            Ok(false)
        );
        assert_eq!(values_equal(&Value::Nil, &Value::Int(0)), Ok(false));
    }

    #[test]
    fn bool_equality_is_unsupported() {
        assert!(values_equal(&Value::Bool(true), &Value::Bool(true)).is_err());
    }

    #[test]
    fn lists_and_maps_compare_deeply() {
        let a = Value::List(vec![Value::Int(1), Value::Str("x".to_string())]);
        let b = Value::List(vec![Value::Int(1), Value::Str("x".to_string())]);
        assert_eq!(values_equal(&a, &b), Ok(true));

        let mut left = BTreeMap::new();
        left.insert("k".to_string(), Value::Int(1));
        let mut right = BTreeMap::new();
        right.insert("k".to_string(), Value::Float(1.0));
        assert_eq!(values_equal(&Value::Map(left), &Value::Map(right)), Ok(true));
    }

    #[test]
    fn renders_values_for_output() {
        assert_eq!(Value::Str("hi".to_string()).render(), "hi");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::Int(2)]).render(),
            "[1, 2]"
        );
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Int(1));
        assert_eq!(Value::Map(map).render(), "{a = 1}");
    }
}
