//! Runtime values.
//!
//! Five scalar variants with no implicit conversion between them; the
//! evaluator checks variant tags before every operation. Display is the
//! user-facing rendering, `debug_rendering` additionally quotes strings.

use std::fmt;

use num_bigint::BigInt;

use crate::ast::{fmt_float, quote_string};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Diagnostic rendering: like `Display`, but strings keep their quotes
    /// and escapes.
    pub fn debug_rendering(&self) -> String {
        match self {
            Value::Str(s) => quote_string(s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{}", fmt_float(*x)),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}
