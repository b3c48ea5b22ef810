use serde::{Deserialize, Serialize};

/// A compile-time constant stored in a program's constant pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
    /// A type descriptor created by `type(a, b)`: its parameter names.
    Type(Vec<String>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => write!(f, "nil"),
            Value::Type(params) => write!(f, "type({})", params.join(", ")),
        }
    }
}
