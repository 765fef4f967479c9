use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

/// Compiles a JSON where-clause into a parameterised Postgres predicate.
///
/// String parameters compare against `"column"::text` so that uuid, integer and
/// text columns can all be matched from JSON input without per-table type knowledge.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    /// Returns the predicate (empty when there is nothing to filter on) and its params
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        self.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions_snapshot = std::mem::take(&mut self.conditions);
        for condition in &conditions_snapshot {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        Ok((sql_conditions.join(" AND "), std::mem::take(&mut self.param_values)))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        self.parse_logical_operator(key, value)?;
                    } else {
                        Self::validate_column(key)?;
                        self.parse_field_condition(key, value)?;
                    }
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<(), FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    let empty = if op == "$and" { "1=1" } else { "1=0" };
                    self.push_fragment(empty.to_string());
                    return Ok(());
                }
                let mut sql_parts = Vec::new();
                for v in arr {
                    let (sql, params) = Self::generate(v, self.param_index)?;
                    self.param_index += params.len();
                    self.param_values.extend(params);
                    sql_parts.push(format!("({})", if sql.is_empty() { "1=1".to_string() } else { sql }));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                self.push_fragment(format!("({})", sql_parts.join(joiner)));
                Ok(())
            }
            "$not" => {
                let (sql, params) = Self::generate(value, self.param_index)?;
                self.param_index += params.len();
                self.param_values.extend(params);
                let inner = if sql.is_empty() { "1=1".to_string() } else { sql };
                self.push_fragment(format!("NOT ({})", inner));
                Ok(())
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn push_fragment(&mut self, sql: String) {
        self.conditions.push(FilterWhereInfo { column: sql, operator: FilterOp::Text, data: Value::Null });
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = FilterOp::parse(op_key)
                    .ok_or_else(|| FilterError::UnsupportedOperator(op_key.to_string()))?;
                self.conditions.push(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() });
            }
        } else {
            // Implicit equality: { field: value }
            self.conditions.push(FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() });
        }
        Ok(())
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        if condition.operator == FilterOp::Text {
            return Ok(condition.column.clone());
        }

        let data = &condition.data;
        match condition.operator {
            FilterOp::Eq if data.is_null() => Ok(format!("\"{}\" IS NULL", condition.column)),
            FilterOp::Neq if data.is_null() => Ok(format!("\"{}\" IS NOT NULL", condition.column)),
            FilterOp::Eq => Ok(format!("{} = {}", Self::column_for(&condition.column, data), self.param(data.clone()))),
            FilterOp::Neq => Ok(format!("{} <> {}", Self::column_for(&condition.column, data), self.param(data.clone()))),
            FilterOp::Gt => Ok(format!("{} > {}", Self::column_for(&condition.column, data), self.param(data.clone()))),
            FilterOp::Gte => Ok(format!("{} >= {}", Self::column_for(&condition.column, data), self.param(data.clone()))),
            FilterOp::Lt => Ok(format!("{} < {}", Self::column_for(&condition.column, data), self.param(data.clone()))),
            FilterOp::Lte => Ok(format!("{} <= {}", Self::column_for(&condition.column, data), self.param(data.clone()))),
            FilterOp::In | FilterOp::NIn => {
                let values = data
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$in/$nin requires array".to_string()))?;
                let negated = condition.operator == FilterOp::NIn;
                if values.is_empty() {
                    return Ok(if negated { "1=1" } else { "1=0" }.to_string());
                }
                let column = Self::column_for(&condition.column, &values[0]);
                let params: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                let keyword = if negated { "NOT IN" } else { "IN" };
                Ok(format!("{} {} ({})", column, keyword, params.join(", ")))
            }
            FilterOp::Text => unreachable!("handled above"),
        }
    }

    fn column_for(column: &str, sample: &Value) -> String {
        match sample {
            Value::String(_) => format!("\"{}\"::text", column),
            _ => format!("\"{}\"", column),
        }
    }

    fn validate_column(column: &str) -> Result<(), FilterError> {
        let valid = !column.is_empty()
            && column.chars().all(|c| c.is_alphanumeric() || c == '_')
            && !column.starts_with(|c: char| c.is_ascii_digit());
        if valid {
            Ok(())
        } else {
            Err(FilterError::InvalidColumn(column.to_string()))
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generates_typed_equality() {
        let (sql, params) = FilterWhere::generate(&json!({ "organization_id": "abc", "id": 4 }), 0).unwrap();
        assert_eq!(sql, "\"id\" = $1 AND \"organization_id\"::text = $2");
        assert_eq!(params, vec![json!(4), json!("abc")]);
    }

    #[test]
    fn generates_or_with_continuous_params() {
        let where_data = json!({
            "organization_id": "org",
            "$or": [ { "role": "admin" }, { "is_site_creator": true } ]
        });
        let (sql, params) = FilterWhere::generate(&where_data, 0).unwrap();
        assert_eq!(
            sql,
            "((\"role\"::text = $1) OR (\"is_site_creator\" = $2)) AND \"organization_id\"::text = $3"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": { "$in": [] } }), 0).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn null_equality_uses_is_null() {
        let (sql, _) = FilterWhere::generate(&json!({ "menu_item_id": null }), 0).unwrap();
        assert_eq!(sql, "\"menu_item_id\" IS NULL");
    }

    #[test]
    fn rejects_injection_in_column_names() {
        let err = FilterWhere::generate(&json!({ "id\"; DROP TABLE x; --": 1 }), 0).unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(_)));
    }

    #[test]
    fn rejects_unknown_operator() {
        let err = FilterWhere::generate(&json!({ "id": { "$regex": "x" } }), 0).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator(_)));
    }
}
