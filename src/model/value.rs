//! Scalar value type used throughout the property graph and query language.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A property value: string, number, boolean, null, or a homogeneous list of
/// these. This is the entire value domain allowed in node/edge property maps
/// and in literal/comparison expressions — there is no Map, Node, Relationship
/// or temporal/spatial variant; graph-shaped data is represented directly as
/// `Node`/`Edge`/`Path` at the binding layer rather than boxed into a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::List(_) => "LIST",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }
    pub fn is_numeric(&self) -> bool { matches!(self, Value::Int(_) | Value::Float(_)) }
    pub fn is_string(&self) -> bool { matches!(self, Value::String(_)) }

    /// Truthiness used by boolean composition: null and `false` are falsy,
    /// everything else (including empty strings/lists) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Strict equality used by default property/comparison matching — no
    /// coercion between numeric/string/boolean representations.
    pub fn strict_eq(&self, other: &Value) -> bool {
        self == other
    }

    /// Equality with the type-coercion rules from the matcher's
    /// `type_coercion` option: numeric string <-> number, boolean <->
    /// `"true"`/`"false"` string, boolean <-> `1`/`0` number.
    pub fn coerced_eq(&self, other: &Value) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
                s.parse::<i64>().map(|parsed| parsed == *n).unwrap_or(false)
            }
            (Value::String(s), Value::Float(n)) | (Value::Float(n), Value::String(s)) => {
                s.parse::<f64>().map(|parsed| parsed == *n).unwrap_or(false)
            }
            (Value::String(s), Value::Bool(b)) | (Value::Bool(b), Value::String(s)) => {
                match s.as_str() {
                    "true" => *b,
                    "false" => !*b,
                    _ => false,
                }
            }
            (Value::Int(n), Value::Bool(b)) | (Value::Bool(b), Value::Int(n)) => {
                (*n == 1 && *b) || (*n == 0 && !*b)
            }
            _ => false,
        }
    }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Value {
    /// Ordering used by comparison operators. Returns `None` for `NULL` on
    /// either side (two-absent equality is handled separately by the
    /// evaluator, not here) and for incompatible operand types.
    pub fn ordering_cmp(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}
