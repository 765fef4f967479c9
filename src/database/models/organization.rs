use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::store::Row;

/// Tenant type of an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgType {
    Platform,
    General,
    Child,
}

impl OrgType {
    /// Unknown or missing types get the narrowest scope
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("platform") => OrgType::Platform,
            Some("general") => OrgType::General,
            _ => OrgType::Child,
        }
    }

    /// Platform and general organizations may manage organizations their team created
    pub fn manages_others(&self) -> bool {
        matches!(self, OrgType::Platform | OrgType::General)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Organization {
    pub id: String,
    pub name: Option<String>,
    pub org_type: OrgType,
    pub created_by_email: Option<String>,
}

impl Organization {
    pub fn from_row(row: &Row) -> Option<Self> {
        let id = match row.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(Self {
            id,
            name: text(row, "name"),
            org_type: OrgType::parse(row.get("type").and_then(Value::as_str)),
            created_by_email: text(row, "created_by_email"),
        })
    }
}

pub(crate) fn text(row: &Row, column: &str) -> Option<String> {
    row.get(column)
        .and_then(Value::as_str)
        .map(str::to_string)
}
