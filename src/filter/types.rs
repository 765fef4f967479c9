use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NIn,
    /// Pre-rendered SQL fragment produced by a logical operator
    Text,
}

impl FilterOp {
    pub fn parse(op_key: &str) -> Option<Self> {
        Some(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Neq,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            _ => return None,
        })
    }
}

/// Query description shared by every store backend.
///
/// `where_clause` uses the JSON operator language:
/// `{ "organization_id": "…", "id": { "$in": [1, 2] }, "$or": [ {…}, {…} ] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    #[serde(rename = "where", alias = "where_clause")]
    pub where_clause: Option<Value>,
    pub order: Option<Value>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl FilterData {
    /// Filter on a single column equality
    pub fn by(column: &str, value: impl Into<Value>) -> Self {
        Self::default().and(column, value)
    }

    /// Add another top-level condition (AND semantics)
    pub fn and(mut self, column: &str, value: impl Into<Value>) -> Self {
        let mut conditions = match self.where_clause.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        conditions.insert(column.to_string(), value.into());
        self.where_clause = Some(Value::Object(conditions));
        self
    }

    pub fn order_by(mut self, spec: &str) -> Self {
        self.order = Some(Value::String(spec.to_string()));
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_accumulates_conditions() {
        let filter = FilterData::by("organization_id", "org-1")
            .and("id", json!({ "$in": [1, 2] }))
            .order_by("order asc")
            .limit(10);

        assert_eq!(
            filter.where_clause,
            Some(json!({ "organization_id": "org-1", "id": { "$in": [1, 2] } }))
        );
        assert_eq!(filter.order, Some(json!("order asc")));
        assert_eq!(filter.limit, Some(10));
    }

    #[test]
    fn deserializes_where_key() {
        let filter: FilterData = serde_json::from_value(json!({ "where": { "id": 3 } })).unwrap();
        assert_eq!(filter.where_clause, Some(json!({ "id": 3 })));
    }
}
