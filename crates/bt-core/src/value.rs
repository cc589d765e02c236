use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A literal scalar stored on the blackboard or bound to a predicate parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ValueKind {
    Bool,
    Int,
    Double,
    Str,
}

impl Value {
    /// Converts a bare literal: booleans, then integers, then doubles, then quoted strings
    /// (quotes stripped); anything else is kept verbatim as a string.
    pub fn parse_literal(text: &str) -> Value {
        let text = text.trim();
        if let Ok(b) = text.parse::<bool>() {
            return Value::Bool(b);
        }
        if let Ok(i) = text.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(d) = text.parse::<f64>() {
            return Value::Double(d);
        }
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return Value::Str(text[1..text.len() - 1].to_string());
        }
        Value::Str(text.to_string())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::Str(_) => ValueKind::Str,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value can be stored in a slot declared as `kind`. Integers widen to doubles.
    pub fn fits(&self, kind: ValueKind) -> bool {
        self.kind() == kind || (matches!(self, Value::Int(_)) && kind == ValueKind::Double)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl FromStr for ValueKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(ValueKind::Bool),
            "int" | "integer" => Ok(ValueKind::Int),
            "double" | "float" | "number" => Ok(ValueKind::Double),
            "string" | "str" => Ok(ValueKind::Str),
            other => Err(CoreError::invalid(format!("unknown value kind '{other}'"))),
        }
    }
}
