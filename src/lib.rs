// Rollbook - student roster store with named constraints on SQLite

pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod query;
pub mod store;

// Re-export main types for convenience
pub use config::DatabaseUrl;
pub use error::{Constraint, Result, StoreError};
pub use filter::{Field, Filter, FilterOp, Value, ValueKind};
pub use models::{EMAIL_MAX_LEN, GRADE_MAX, GRADE_MIN, NewStudent, Student, StudentChanges, now};
pub use query::Query;
pub use store::Store;

// Re-export rusqlite for callers that need the raw connection
pub use rusqlite;
