use serde::Serialize;
use serde_json::Value;

use super::organization::text;
use crate::database::store::Row;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
    Other,
}

impl Role {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("admin") => Role::Admin,
            Some("member") => Role::Member,
            _ => Role::Other,
        }
    }
}

/// Caller profile: role, home organization and site-creator flag
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub role: Role,
    pub organization_id: Option<String>,
    pub is_site_creator: bool,
    pub email: Option<String>,
}

impl Profile {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            id: text(row, "id")?,
            role: Role::parse(row.get("role").and_then(Value::as_str)),
            organization_id: match row.get("organization_id") {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            },
            is_site_creator: row.get("is_site_creator").and_then(Value::as_bool).unwrap_or(false),
            email: text(row, "email"),
        })
    }
}
