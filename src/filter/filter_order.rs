use serde_json::Value;

use super::types::{FilterOrderInfo, SortDirection};
use super::error::FilterError;

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["created_at desc", "name asc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v { out.extend(Self::parse_order_string(s)); }
                }
                out
            }
            Value::Object(obj) => {
                // { "created_at": "desc", "name": "asc" }
                obj.iter()
                    .map(|(k, v)| {
                        let sort = match v.as_str().unwrap_or("asc").to_ascii_lowercase().as_str() {
                            "desc" => SortDirection::Desc,
                            _ => SortDirection::Asc,
                        };
                        FilterOrderInfo { column: k.clone(), sort }
                    })
                    .collect()
            }
            _ => vec![],
        };

        for info in &infos {
            if info.column.is_empty() || !info.column.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(FilterError::InvalidColumn(info.column.clone()));
            }
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let dir = it.next().unwrap_or("asc");
                let sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        out
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() { return String::new(); }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_spec() {
        let infos = FilterOrder::validate_and_parse(&json!("order asc, created_at desc")).unwrap();
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"order\" ASC, \"created_at\" DESC");
    }

    #[test]
    fn rejects_bad_columns() {
        assert!(FilterOrder::validate_and_parse(&json!("id; drop")).is_err());
    }
}
