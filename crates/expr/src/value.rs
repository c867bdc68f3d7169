//! Runtime values and JSON conversion helpers.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::ExprError;

/// A runtime value. All numbers are `rust_decimal::Decimal` -- never `f64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Number(Decimal),
    Text(String),
}

/// A read-only variable scope (`userContext`, `planContext`, document variables).
pub type Context = BTreeMap<String, Value>;

impl Value {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::Text(_) => "String",
        }
    }

    /// Extracts a boolean or returns an unexpected-result error.
    pub fn as_bool(&self) -> Result<bool, ExprError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(ExprError::UnexpectedResult {
                expected: "Boolean".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    /// Extracts a number or returns an unexpected-result error.
    pub fn as_number(&self) -> Result<Decimal, ExprError> {
        match self {
            Value::Number(d) => Ok(*d),
            other => Err(ExprError::UnexpectedResult {
                expected: "Number".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    /// Convert a JSON scalar into a value. Arrays, objects and null have no
    /// expression-level representation and yield `None`.
    pub fn from_json(v: &serde_json::Value) -> Option<Value> {
        match v {
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => number_from_json(n).map(Value::Number),
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(d) => decimal_to_json(*d),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(d) => write!(f, "{}", d.normalize()),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Number(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Build a [`Context`] from a JSON object. Entries that are not scalars
/// cannot be referenced by an expression and are left out, with a debug log
/// per key.
pub fn context_from_json(obj: &serde_json::Value) -> Context {
    let Some(map) = obj.as_object() else {
        return Context::new();
    };
    map.iter()
        .filter_map(|(k, v)| match Value::from_json(v) {
            Some(val) => Some((k.clone(), val)),
            None => {
                debug!(key = %k, kind = json_kind(v), "context entry is not a scalar, skipped");
                None
            }
        })
        .collect()
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn number_from_json(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    n.as_f64().and_then(Decimal::from_f64)
}

/// Integral decimals become JSON integers, everything else a JSON float.
pub fn decimal_to_json(d: Decimal) -> serde_json::Value {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return serde_json::Value::from(i);
        }
    }
    d.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
