// Query filtering over student columns

use crate::error::{Result, StoreError};
use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, ToSqlOutput};

/// Columns of the `students` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Email,
    Grade,
    Birthday,
    EnrolledDate,
}

/// Kind of value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Text,
    DateTime,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Id,
        Field::Name,
        Field::Email,
        Field::Grade,
        Field::Birthday,
        Field::EnrolledDate,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Email => "email",
            Field::Grade => "grade",
            Field::Birthday => "birthday",
            Field::EnrolledDate => "enrolled_date",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Field::Id | Field::Grade => ValueKind::Int,
            Field::Name | Field::Email => ValueKind::Text,
            Field::Birthday | Field::EnrolledDate => ValueKind::DateTime,
        }
    }

    pub fn is_nullable(self) -> bool {
        self == Field::Birthday
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.column() == s)
            .ok_or_else(|| format!("unknown field: {} (expected one of id, name, email, grade, birthday, enrolled_date)", s))
    }
}

/// Values that can be compared against a field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Text(String),
    DateTime(NaiveDateTime),
    Null,
}

impl Value {
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Int(_) => Some(ValueKind::Int),
            Value::Text(_) => Some(ValueKind::Text),
            Value::DateTime(_) => Some(ValueKind::DateTime),
            Value::Null => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Int(i) => i.to_sql(),
            Value::Text(s) => s.to_sql(),
            Value::DateTime(dt) => dt.to_sql(),
            Value::Null => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Null)),
        }
    }
}

/// Filter for querying records
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field to filter on
    pub field: Field,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: Value,
}

/// Comparison operators for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,       // ==
    Ne,       // !=
    Gt,       // >
    Lt,       // <
    Gte,      // >=
    Lte,      // <=
    Contains, // LIKE %value%
    Like,     // LIKE value
}

impl FilterOp {
    pub(crate) fn to_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
            FilterOp::Contains | FilterOp::Like => "LIKE",
        }
    }

    fn is_pattern(self) -> bool {
        matches!(self, FilterOp::Contains | FilterOp::Like)
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterOp::Eq => write!(f, "="),
            FilterOp::Ne => write!(f, "!="),
            FilterOp::Gt => write!(f, ">"),
            FilterOp::Lt => write!(f, "<"),
            FilterOp::Gte => write!(f, ">="),
            FilterOp::Lte => write!(f, "<="),
            FilterOp::Contains => write!(f, "CONTAINS"),
            FilterOp::Like => write!(f, "LIKE"),
        }
    }
}

impl Filter {
    pub fn new(field: Field, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: Field, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Substring match (SQLite LIKE, case-insensitive for ASCII)
    pub fn contains(field: Field, needle: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Contains, Value::Text(needle.into()))
    }

    /// Raw LIKE pattern with `%` and `_` wildcards
    pub fn like(field: Field, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Like, Value::Text(pattern.into()))
    }

    /// Check the operator and value make sense for the field
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| StoreError::InvalidFilter {
            field: self.field,
            reason,
        };

        match self.value.kind() {
            None => {
                if !matches!(self.op, FilterOp::Eq | FilterOp::Ne) {
                    return Err(invalid(format!("operator {} cannot compare against NULL", self.op)));
                }
                if !self.field.is_nullable() {
                    return Err(invalid("field is never NULL".to_string()));
                }
            }
            Some(kind) => {
                if self.op.is_pattern() && self.field.kind() != ValueKind::Text {
                    return Err(invalid(format!("operator {} needs a text field", self.op)));
                }
                if kind != self.field.kind() {
                    return Err(invalid(format!(
                        "expected a {:?} value, got {:?} ({})",
                        self.field.kind(),
                        kind,
                        self.value
                    )));
                }
            }
        }

        Ok(())
    }

    /// SQL condition for this filter using placeholder `?{index}`, plus the value to bind.
    ///
    /// NULL comparisons bind nothing.
    pub(crate) fn to_sql(&self, index: usize) -> (String, Option<Value>) {
        let column = self.field.column();
        match (&self.value, self.op) {
            (Value::Null, FilterOp::Ne) => (format!("{} IS NOT NULL", column), None),
            (Value::Null, _) => (format!("{} IS NULL", column), None),
            (Value::Text(needle), FilterOp::Contains) => (
                format!("{} LIKE ?{} ESCAPE '\\'", column, index),
                Some(Value::Text(format!("%{}%", escape_like(needle)))),
            ),
            (value, op) => (format!("{} {} ?{}", column, op.to_sql(), index), Some(value.clone())),
        }
    }
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_creation() {
        let filter = Filter::eq(Field::Grade, 11);

        assert_eq!(filter.field, Field::Grade);
        assert_eq!(filter.op, FilterOp::Eq);
        assert_eq!(filter.value, Value::Int(11));
    }

    #[test]
    fn test_filter_op_to_sql() {
        assert_eq!(FilterOp::Eq.to_sql(), "=");
        assert_eq!(FilterOp::Ne.to_sql(), "!=");
        assert_eq!(FilterOp::Gt.to_sql(), ">");
        assert_eq!(FilterOp::Lt.to_sql(), "<");
        assert_eq!(FilterOp::Gte.to_sql(), ">=");
        assert_eq!(FilterOp::Lte.to_sql(), "<=");
        assert_eq!(FilterOp::Contains.to_sql(), "LIKE");
        assert_eq!(FilterOp::Like.to_sql(), "LIKE");
    }

    #[test]
    fn test_filter_op_display() {
        assert_eq!(FilterOp::Eq.to_string(), "=");
        assert_eq!(FilterOp::Contains.to_string(), "CONTAINS");
    }

    #[test]
    fn test_field_from_str() {
        assert_eq!("enrolled_date".parse::<Field>().unwrap(), Field::EnrolledDate);
        assert_eq!("name".parse::<Field>().unwrap(), Field::Name);
        assert!("age".parse::<Field>().is_err());
    }

    #[test]
    fn test_contains_escapes_wildcards() {
        let (sql, value) = Filter::contains(Field::Name, "50%_off").to_sql(1);
        assert_eq!(sql, "name LIKE ?1 ESCAPE '\\'");
        assert_eq!(value, Some(Value::Text("%50\\%\\_off%".to_string())));
    }

    #[test]
    fn test_null_filters_bind_nothing() {
        let (sql, value) = Filter::eq(Field::Birthday, Value::Null).to_sql(3);
        assert_eq!(sql, "birthday IS NULL");
        assert!(value.is_none());

        let (sql, _) = Filter::new(Field::Birthday, FilterOp::Ne, Value::Null).to_sql(3);
        assert_eq!(sql, "birthday IS NOT NULL");
    }

    #[test]
    fn test_validate_rejects_mismatched_kinds() {
        assert!(Filter::eq(Field::Grade, 6).validate().is_ok());
        assert!(Filter::eq(Field::Grade, "six").validate().is_err());
        assert!(Filter::contains(Field::Grade, "6").validate().is_err());
        assert!(Filter::eq(Field::Name, Value::Null).validate().is_err());
        assert!(Filter::new(Field::Birthday, FilterOp::Gt, Value::Null).validate().is_err());
        assert!(Filter::eq(Field::Birthday, Value::Null).validate().is_ok());
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }
}
