// Query builder: filter, order, limit

use crate::error::Result;
use crate::filter::{Field, Filter, Value};

pub(crate) const STUDENT_COLUMNS: &str = "id, name, email, grade, birthday, enrolled_date";

/// A query over the `students` table
///
/// Filters are AND-ed together. Results are ordered by `order_by` (default `id`,
/// which is insertion order) and ties are always broken by ascending `id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<Field>,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: Field) -> Self {
        self.order_by = Some(field);
        self
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compile to SQL and bind values
    pub(crate) fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let (where_clause, mut params) = where_clause(&self.filters)?;

        let mut sql = format!("SELECT {} FROM students{}", STUDENT_COLUMNS, where_clause);

        let order_field = self.order_by.unwrap_or(Field::Id);
        let direction = if self.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {}", order_field.column(), direction));
        if order_field != Field::Id {
            sql.push_str(", id ASC");
        }

        if let Some(limit) = self.limit {
            params.push(Value::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
        }

        Ok((sql, params))
    }
}

/// Build ` WHERE a AND b ...` (or an empty string) for the given filters
pub(crate) fn where_clause(filters: &[Filter]) -> Result<(String, Vec<Value>)> {
    let mut conditions = Vec::with_capacity(filters.len());
    let mut params = Vec::new();

    for filter in filters {
        filter.validate()?;
        let (condition, value) = filter.to_sql(params.len() + 1);
        if let Some(value) = value {
            params.push(value);
        }
        conditions.push(condition);
    }

    if conditions.is_empty() {
        Ok((String::new(), params))
    } else {
        Ok((format!(" WHERE {}", conditions.join(" AND ")), params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOp;

    #[test]
    fn test_default_query_orders_by_id() {
        let (sql, params) = Query::new().to_sql().unwrap();
        assert_eq!(sql, format!("SELECT {} FROM students ORDER BY id ASC", STUDENT_COLUMNS));
        assert!(params.is_empty());
    }

    #[test]
    fn test_order_desc_with_limit_breaks_ties_by_id() {
        let (sql, params) = Query::new().order_by(Field::Grade).descending().limit(1).to_sql().unwrap();
        assert!(sql.ends_with(" ORDER BY grade DESC, id ASC LIMIT ?1"));
        assert_eq!(params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_filters_are_anded_with_numbered_params() {
        let query = Query::new()
            .filter(Filter::contains(Field::Name, "Alan"))
            .filter(Filter::eq(Field::Birthday, Value::Null))
            .filter(Filter::new(Field::Grade, FilterOp::Gte, 11))
            .limit(5);
        let (sql, params) = query.to_sql().unwrap();

        assert!(sql.contains(" WHERE name LIKE ?1 ESCAPE '\\' AND birthday IS NULL AND grade >= ?2"));
        assert!(sql.ends_with("LIMIT ?3"));
        assert_eq!(
            params,
            vec![Value::Text("%Alan%".to_string()), Value::Int(11), Value::Int(5)]
        );
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let query = Query::new().filter(Filter::eq(Field::Email, 3));
        assert!(query.to_sql().is_err());
    }
}
