// In-memory evaluation of FilterData, mirroring the SQL semantics of FilterWhere
use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::types::{FilterData, FilterOp, SortDirection};

impl FilterData {
    /// Whether a JSON row satisfies the where clause
    pub fn matches(&self, row: &Map<String, Value>) -> Result<bool, FilterError> {
        match &self.where_clause {
            None | Some(Value::Null) => Ok(true),
            Some(where_data) => matches_where(where_data, row),
        }
    }

    /// Filter, order and paginate a set of rows
    pub fn apply(&self, rows: Vec<Map<String, Value>>) -> Result<Vec<Map<String, Value>>, FilterError> {
        let mut selected = Vec::with_capacity(rows.len());
        for row in rows {
            if self.matches(&row)? {
                selected.push(row);
            }
        }

        if let Some(order) = &self.order {
            let infos = FilterOrder::validate_and_parse(order)?;
            selected.sort_by(|a, b| {
                for info in &infos {
                    let ordering = compare_values(a.get(&info.column), b.get(&info.column));
                    let ordering = match info.sort {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = self.offset.unwrap_or(0).max(0) as usize;
        let limit = self.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(selected.into_iter().skip(offset).take(limit).collect())
    }
}

fn matches_where(where_data: &Value, row: &Map<String, Value>) -> Result<bool, FilterError> {
    let conditions = where_data
        .as_object()
        .ok_or_else(|| FilterError::InvalidWhereClause("WHERE must be an object".to_string()))?;

    for (key, value) in conditions {
        let satisfied = match key.as_str() {
            "$and" => {
                let mut all = true;
                for sub in as_array(key, value)? {
                    all &= matches_where(sub, row)?;
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in as_array(key, value)? {
                    any |= matches_where(sub, row)?;
                }
                any
            }
            "$not" => !matches_where(value, row)?,
            op if op.starts_with('$') => return Err(FilterError::UnsupportedOperator(op.to_string())),
            column => matches_field(row.get(column), value)?,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn as_array<'a>(op: &str, value: &'a Value) -> Result<&'a Vec<Value>, FilterError> {
    value
        .as_array()
        .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))
}

fn matches_field(actual: Option<&Value>, condition: &Value) -> Result<bool, FilterError> {
    let actual = actual.unwrap_or(&Value::Null);
    let Value::Object(ops) = condition else {
        return Ok(loosely_equal(actual, condition));
    };

    for (op_key, expected) in ops {
        let op = FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
        let satisfied = match op {
            FilterOp::Eq => loosely_equal(actual, expected),
            FilterOp::Neq => !loosely_equal(actual, expected),
            FilterOp::Gt => !actual.is_null() && compare_values(Some(actual), Some(expected)) == Ordering::Greater,
            FilterOp::Gte => !actual.is_null() && compare_values(Some(actual), Some(expected)) != Ordering::Less,
            FilterOp::Lt => !actual.is_null() && compare_values(Some(actual), Some(expected)) == Ordering::Less,
            FilterOp::Lte => !actual.is_null() && compare_values(Some(actual), Some(expected)) != Ordering::Greater,
            FilterOp::In | FilterOp::NIn => {
                let found = as_array(op_key, expected)?.iter().any(|candidate| loosely_equal(actual, candidate));
                if op == FilterOp::In { found } else { !found }
            }
            FilterOp::Text => false,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality with the same leniency as the `::text` cast used in SQL
fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b) && (a == b || uuid::Uuid::parse_str(a).is_ok()),
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(s), other) | (other, Value::String(s)) => scalar_text(other).as_deref() == Some(s.as_str()),
        (a, b) => a == b,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Total order used for sorting: nulls sort high (as in Postgres), numbers numerically, everything else as text
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => scalar_text(x).cmp(&scalar_text(y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn matches_equality_and_or() {
        let filter = FilterData {
            where_clause: Some(json!({
                "organization_id": "org-1",
                "$or": [ { "role": "admin" }, { "is_site_creator": true } ]
            })),
            ..Default::default()
        };

        assert!(filter.matches(&row(json!({ "organization_id": "org-1", "role": "admin" }))).unwrap());
        assert!(filter.matches(&row(json!({ "organization_id": "org-1", "role": "member", "is_site_creator": true }))).unwrap());
        assert!(!filter.matches(&row(json!({ "organization_id": "org-1", "role": "member", "is_site_creator": false }))).unwrap());
        assert!(!filter.matches(&row(json!({ "organization_id": "org-2", "role": "admin" }))).unwrap());
    }

    #[test]
    fn numbers_match_numeric_strings() {
        let filter = FilterData::by("id", "12");
        assert!(filter.matches(&row(json!({ "id": 12 }))).unwrap());
        assert!(!filter.matches(&row(json!({ "id": 13 }))).unwrap());
    }

    #[test]
    fn uuid_comparison_ignores_case() {
        let filter = FilterData::by("organization_id", "A0EEBC99-9C0B-4EF8-BB6D-6BB9BD380A11");
        assert!(filter
            .matches(&row(json!({ "organization_id": "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11" })))
            .unwrap());
    }

    #[test]
    fn applies_order_and_limit() {
        let rows = vec![
            row(json!({ "id": 1, "created_at": "2024-01-01" })),
            row(json!({ "id": 2, "created_at": "2024-03-01" })),
            row(json!({ "id": 3, "created_at": "2024-02-01" })),
        ];
        let filter = FilterData::default().order_by("created_at desc").limit(2);
        let ids: Vec<_> = filter.apply(rows).unwrap().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(3)]);
    }

    #[test]
    fn in_operator() {
        let filter = FilterData::by("id", json!({ "$in": [1, 3] }));
        assert!(filter.matches(&row(json!({ "id": 3 }))).unwrap());
        assert!(!filter.matches(&row(json!({ "id": 2 }))).unwrap());
    }
}
