// Store errors and the named table constraints they report

use crate::filter::Field;
use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Named constraints declared on the `students` table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Primary key uniqueness on `id`
    IdPk,
    /// Uniqueness on `email`
    UniqueEmail,
    /// `grade BETWEEN 1 AND 12`
    GradeRange,
    /// `length(email) <= 55`
    EmailLength,
    /// Name must not be blank
    NameRequired,
}

impl Constraint {
    /// Constraint name as declared in the schema
    pub fn name(self) -> &'static str {
        match self {
            Constraint::IdPk => "id_pk",
            Constraint::UniqueEmail => "unique_email",
            Constraint::GradeRange => "grade_between_1_and_12",
            Constraint::EmailLength => "email_max_length",
            Constraint::NameRequired => "name_not_empty",
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint {constraint} violated by value {value:?}")]
    ConstraintViolation { constraint: Constraint, value: String },

    #[error("batch entry {index} rejected: {source}")]
    BatchEntry {
        index: usize,
        #[source]
        source: Box<StoreError>,
    },

    #[error("no student ids left to assign")]
    IdsExhausted,

    #[error("student {0} not found")]
    NotFound(i64),

    #[error("invalid filter on {field}: {reason}")]
    InvalidFilter { field: Field, reason: String },

    #[error("invalid database url: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn violation(constraint: Constraint, value: impl ToString) -> Self {
        StoreError::ConstraintViolation {
            constraint,
            value: value.to_string(),
        }
    }

    /// The violated constraint, if this error (or the batch entry it wraps) is a violation
    pub fn constraint(&self) -> Option<Constraint> {
        match self {
            StoreError::ConstraintViolation { constraint, .. } => Some(*constraint),
            StoreError::BatchEntry { source, .. } => source.constraint(),
            _ => None,
        }
    }

    /// Map a SQLite constraint failure back onto the named constraint it hit.
    ///
    /// `value_of` renders the offending value for the constraint that was hit. Anything that
    /// isn't a recognisable constraint failure is passed through as `Database`.
    pub(crate) fn from_sqlite(err: rusqlite::Error, value_of: impl FnOnce(Constraint) -> String) -> Self {
        let constraint = match &err {
            rusqlite::Error::SqliteFailure(failure, Some(message)) if failure.code == ErrorCode::ConstraintViolation => {
                classify_constraint_message(message)
            }
            _ => None,
        };

        match constraint {
            Some(constraint) => StoreError::violation(constraint, value_of(constraint)),
            None => StoreError::Database(err),
        }
    }
}

/// SQLite reports e.g. "UNIQUE constraint failed: students.email" or
/// "CHECK constraint failed: grade_between_1_and_12".
fn classify_constraint_message(message: &str) -> Option<Constraint> {
    if message.contains("students.email") || message.contains(Constraint::UniqueEmail.name()) {
        Some(Constraint::UniqueEmail)
    } else if message.contains("students.id") || message.contains(Constraint::IdPk.name()) {
        Some(Constraint::IdPk)
    } else if message.contains(Constraint::GradeRange.name()) {
        Some(Constraint::GradeRange)
    } else if message.contains(Constraint::EmailLength.name()) {
        Some(Constraint::EmailLength)
    } else if message.contains(Constraint::NameRequired.name()) {
        Some(Constraint::NameRequired)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_names() {
        assert_eq!(Constraint::IdPk.to_string(), "id_pk");
        assert_eq!(Constraint::UniqueEmail.to_string(), "unique_email");
        assert_eq!(Constraint::GradeRange.to_string(), "grade_between_1_and_12");
        assert_eq!(Constraint::EmailLength.to_string(), "email_max_length");
    }

    #[test]
    fn test_classify_constraint_message() {
        assert_eq!(
            classify_constraint_message("UNIQUE constraint failed: students.email"),
            Some(Constraint::UniqueEmail)
        );
        assert_eq!(
            classify_constraint_message("UNIQUE constraint failed: students.id"),
            Some(Constraint::IdPk)
        );
        assert_eq!(
            classify_constraint_message("CHECK constraint failed: grade_between_1_and_12"),
            Some(Constraint::GradeRange)
        );
        assert_eq!(
            classify_constraint_message("CHECK constraint failed: email_max_length"),
            Some(Constraint::EmailLength)
        );
        assert_eq!(
            classify_constraint_message("CHECK constraint failed: name_not_empty"),
            Some(Constraint::NameRequired)
        );
        assert_eq!(classify_constraint_message("NOT NULL constraint failed: students.name"), None);
    }

    #[test]
    fn test_constraint_looks_through_batch_entry() {
        let err = StoreError::BatchEntry {
            index: 2,
            source: Box::new(StoreError::violation(Constraint::GradeRange, 13)),
        };
        assert_eq!(err.constraint(), Some(Constraint::GradeRange));
        assert!(err.to_string().starts_with("batch entry 2 rejected"));

        assert_eq!(StoreError::NotFound(7).constraint(), None);
    }

    #[test]
    fn test_violation_display() {
        let err = StoreError::violation(Constraint::UniqueEmail, "a@b.edu");
        assert_eq!(err.to_string(), "constraint unique_email violated by value \"a@b.edu\"");
    }
}
