//! Client values that arrive with inconsistent JSON types

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A boolean-like value as emitted by the admin UI
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LooseBool {
    Bool(bool),
    Number(Number),
    Text(String),
    #[default]
    Null,
}

impl LooseBool {
    /// Collapse to a strict boolean
    pub fn normalize(&self) -> bool {
        match self {
            LooseBool::Null => false,
            LooseBool::Bool(b) => *b,
            LooseBool::Number(n) => n.as_f64().map(|v| v > 0.0).unwrap_or(false),
            LooseBool::Text(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    true
                } else if s.eq_ignore_ascii_case("false") || s.is_empty() {
                    false
                } else {
                    s.parse::<f64>().map(|v| v > 0.0).unwrap_or(false)
                }
            }
        }
    }
}

/// An integer that may arrive as a number or a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LooseInt {
    Number(Number),
    Text(String),
}

impl LooseInt {
    pub fn value(&self) -> Option<i64> {
        match self {
            LooseInt::Number(n) => n.as_i64().or_else(|| {
                n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)
            }),
            LooseInt::Text(s) => s.trim().parse().ok(),
        }
    }
}

pub fn normalize_bool(value: &Option<LooseBool>) -> Value {
    Value::Bool(value.as_ref().map(LooseBool::normalize).unwrap_or(false))
}

/// Nullable text column: absent becomes null
pub fn text_or_null(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

/// Non-empty after trimming
pub fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}
