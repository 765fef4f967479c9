use std::fmt;

use serde_json::Value;
use uuid::Uuid;

use crate::database::KeyKind;

/// A primary key in a collection's native format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKey {
    Int(i64),
    Uuid(Uuid),
}

impl RowKey {
    /// `None` when the value does not parse in the native format
    pub fn parse(value: &Value, kind: KeyKind) -> Option<Self> {
        match (kind, value) {
            (KeyKind::Serial, Value::Number(n)) => n.as_i64().map(RowKey::Int),
            (KeyKind::Serial, Value::String(s)) => s.trim().parse().ok().map(RowKey::Int),
            (KeyKind::Uuid, Value::String(s)) => Uuid::parse_str(s.trim()).ok().map(RowKey::Uuid),
            _ => None,
        }
    }

    pub fn of_row(row: &serde_json::Map<String, Value>, kind: KeyKind) -> Option<Self> {
        row.get("id").and_then(|v| Self::parse(v, kind))
    }

    pub fn to_value(&self) -> Value {
        match self {
            RowKey::Int(i) => Value::from(*i),
            RowKey::Uuid(u) => Value::String(u.to_string()),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Int(i) => write!(f, "{}", i),
            RowKey::Uuid(u) => write!(f, "{}", u),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serial_keys_accept_numeric_strings() {
        assert_eq!(RowKey::parse(&json!(7), KeyKind::Serial), Some(RowKey::Int(7)));
        assert_eq!(RowKey::parse(&json!("7"), KeyKind::Serial), Some(RowKey::Int(7)));
        assert_eq!(RowKey::parse(&json!("temp-1"), KeyKind::Serial), None);
        assert_eq!(RowKey::parse(&json!(null), KeyKind::Serial), None);
    }

    #[test]
    fn uuid_keys_must_parse() {
        let id = "9b2d7c1e-3f4a-4b5c-8d6e-7f8091a2b3c4";
        assert_eq!(
            RowKey::parse(&json!(id), KeyKind::Uuid).map(|k| k.to_value()),
            Some(json!(id))
        );
        assert_eq!(RowKey::parse(&json!("banner-1"), KeyKind::Uuid), None);
        assert_eq!(RowKey::parse(&json!(12), KeyKind::Uuid), None);
    }
}
