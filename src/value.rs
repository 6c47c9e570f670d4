use std::fmt::{self, Display};

/// The result of evaluating any expression. Booleans are `Integer(0)` and
/// `Integer(1)`; there is no nil value outside of variable storage.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Integer(i64),
    String(String),
}

impl Value {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
        }
    }

    pub(crate) fn is_truthy(&self) -> Option<bool> {
        match self {
            Value::Integer(n) => Some(*n != 0),
            Value::String(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Integer(if b { 1 } else { 0 })
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}
