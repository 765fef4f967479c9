use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, SqlResult};

/// SQL rendering of a [`FilterData`] against one table
pub struct Filter {
    table_name: String,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// `SELECT` producing one JSON object per row in a column named `row`
    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = [
            format!("SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\"", self.table_name),
            Self::where_prefix(&where_result.query),
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query: format!("{}) t", query), params: where_result.params })
    }

    /// `DELETE` scoped by the where clause; an unfiltered delete is refused
    pub fn to_delete_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        if where_result.query.is_empty() {
            return Err(FilterError::InvalidWhereClause("DELETE requires a WHERE clause".to_string()));
        }
        Ok(SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", self.table_name, where_result.query),
            params: where_result.params,
        })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(where_data, 0)?,
            None => (String::new(), vec![]),
        };
        Ok(SqlResult { query, params })
    }

    fn where_prefix(clause: &str) -> String {
        if clause.is_empty() { String::new() } else { format!("WHERE {}", clause) }
    }

    pub(crate) fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_');
        if !valid_start || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_wraps_rows_as_json() {
        let mut filter = Filter::new("website_menuitem").unwrap();
        filter
            .assign(FilterData::by("organization_id", "org").order_by("order asc").limit(5))
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"website_menuitem\" WHERE \"organization_id\"::text = $1 ORDER BY \"order\" ASC LIMIT 5) t"
        );
        assert_eq!(sql.params, vec![json!("org")]);
    }

    #[test]
    fn delete_requires_predicate() {
        let filter = Filter::new("faq").unwrap();
        assert!(filter.to_delete_sql().is_err());

        let mut scoped = Filter::new("faq").unwrap();
        scoped.assign(FilterData::by("id", 7).and("organization_id", "org")).unwrap();
        let sql = scoped.to_delete_sql().unwrap();
        assert_eq!(sql.query, "DELETE FROM \"faq\" WHERE \"id\" = $1 AND \"organization_id\"::text = $2");
    }

    #[test]
    fn rejects_bad_table_names() {
        assert!(Filter::new("").is_err());
        assert!(Filter::new("1table").is_err());
        assert!(Filter::new("faq; drop").is_err());
    }
}
