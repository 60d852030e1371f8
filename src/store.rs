// Student store backed by SQLite

use crate::config::DatabaseUrl;
use crate::error::{Constraint, Result, StoreError};
use crate::filter::Filter;
use crate::models::{EMAIL_MAX_LEN, GRADE_MAX, GRADE_MIN, NewStudent, Student, StudentChanges, now};
use crate::query::{Query, STUDENT_COLUMNS, where_clause};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Student records with named constraints, owned by one SQLite connection
///
/// A store lives as long as the value does: open it, use it, drop it. The
/// in-memory variant disappears with the value.
pub struct Store {
    db: Connection,
}

impl Store {
    /// Open a fresh in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        debug!("Opened in-memory student store");
        Self::from_connection(db)
    }

    /// Open or create a store backed by the SQLite file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let db = Connection::open(path)?;
        info!(path = ?path, "Opened student store");
        Self::from_connection(db)
    }

    /// Open the store a `DatabaseUrl` points at
    pub fn connect(url: &DatabaseUrl) -> Result<Self> {
        match url {
            DatabaseUrl::Memory => Self::open_in_memory(),
            DatabaseUrl::File(path) => Self::open(path),
        }
    }

    fn from_connection(db: Connection) -> Result<Self> {
        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    /// Get a reference to the SQLite database connection
    pub fn db(&self) -> &Connection {
        &self.db
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        // AUTOINCREMENT keeps ids of deleted students from being handed out again
        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER CONSTRAINT id_pk PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL CONSTRAINT name_not_empty CHECK (length(trim(name)) > 0),
                email VARCHAR(55) NOT NULL CONSTRAINT unique_email UNIQUE,
                grade INTEGER NOT NULL,
                birthday TEXT,
                enrolled_date TEXT NOT NULL,
                CONSTRAINT email_max_length CHECK (length(email) <= 55),
                CONSTRAINT grade_between_1_and_12 CHECK (grade BETWEEN 1 AND 12)
            );

            CREATE INDEX IF NOT EXISTS index_name ON students(name);
            "#,
        )?;

        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a student and return it as stored
    pub fn insert(&mut self, student: NewStudent) -> Result<Student> {
        let tx = self.db.transaction()?;
        let inserted = Self::insert_with(&tx, student)?;
        tx.commit()?;

        debug!(id = inserted.id, "Inserted student");
        Ok(inserted)
    }

    /// Insert several students atomically
    ///
    /// The first rejected entry aborts the batch; nothing from a failed batch is kept.
    pub fn insert_many(&mut self, students: Vec<NewStudent>) -> Result<Vec<Student>> {
        let tx = self.db.transaction()?;
        let mut inserted = Vec::with_capacity(students.len());

        for (index, student) in students.into_iter().enumerate() {
            match Self::insert_with(&tx, student) {
                Ok(s) => inserted.push(s),
                Err(e) => {
                    warn!(index, error = %e, "Batch insert rejected, rolling back");
                    return Err(StoreError::BatchEntry {
                        index,
                        source: Box::new(e),
                    });
                }
            }
        }

        tx.commit()?;
        info!(count = inserted.len(), "Inserted batch of students");
        Ok(inserted)
    }

    /// Apply `changes` to the stored version of `student`
    ///
    /// Fails with `NotFound` if the student has been deleted since the handle was read.
    pub fn update(&mut self, student: &Student, changes: StudentChanges) -> Result<Student> {
        let tx = self.db.transaction()?;
        let updated = Self::update_with(&tx, student.id, &changes)?;
        tx.commit()?;

        debug!(id = updated.id, "Updated student");
        Ok(updated)
    }

    /// Update every student matching `filters` with the changes `changes_for` returns.
    /// Returns the number of students changed.
    ///
    /// All updates commit together; any violation leaves every student untouched.
    pub fn update_where<F>(&mut self, filters: &[Filter], mut changes_for: F) -> Result<usize>
    where
        F: FnMut(&Student) -> StudentChanges,
    {
        let tx = self.db.transaction()?;

        let query = Query {
            filters: filters.to_vec(),
            ..Query::default()
        };
        let matches = Self::query_with(&tx, &query)?;

        let mut count = 0;
        for student in &matches {
            let changes = changes_for(student);
            if changes.is_empty() {
                continue;
            }

            if let Err(e) = Self::update_with(&tx, student.id, &changes) {
                warn!(id = student.id, error = %e, "Bulk update rejected, rolling back");
                return Err(e);
            }
            count += 1;
        }

        tx.commit()?;
        info!(count, "Updated students");
        Ok(count)
    }

    /// Delete a student. Returns false if it was already gone.
    pub fn delete(&mut self, student: &Student) -> Result<bool> {
        let removed = self.db.execute("DELETE FROM students WHERE id = ?1", [student.id])?;

        debug!(id = student.id, removed, "Deleted student");
        Ok(removed > 0)
    }

    /// Delete all students matching `filters`. Returns the number deleted.
    pub fn delete_where(&mut self, filters: &[Filter]) -> Result<usize> {
        let (clause, params) = where_clause(filters)?;
        let sql = format!("DELETE FROM students{}", clause);

        let removed = self.db.execute(&sql, params_from_iter(params.iter()))?;

        info!(removed, "Deleted students");
        Ok(removed)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Get a student by id
    pub fn get(&self, id: i64) -> Result<Option<Student>> {
        Self::get_with(&self.db, id)
    }

    /// Run a query and return a snapshot of the matching students
    pub fn query(&self, query: &Query) -> Result<Vec<Student>> {
        Self::query_with(&self.db, query)
    }

    /// First student the query would return, if any
    pub fn first(&self, query: &Query) -> Result<Option<Student>> {
        let query = query.clone().limit(1);
        Ok(self.query(&query)?.into_iter().next())
    }

    /// Number of students matching `filters`
    pub fn count(&self, filters: &[Filter]) -> Result<usize> {
        let (clause, params) = where_clause(filters)?;
        let sql = format!("SELECT COUNT(*) FROM students{}", clause);

        let count: i64 = self
            .db
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;

        Ok(count as usize)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn insert_with(db: &Connection, student: NewStudent) -> Result<Student> {
        Self::validate_fields(&student.name, student.grade, &student.email)?;
        if let Some(id) = student.id {
            Self::validate_explicit_id(db, id)?;
        }
        Self::validate_email_free(db, &student.email, None)?;

        // Evaluated per insert, never shared between students
        let enrolled_date = student.enrolled_date.unwrap_or_else(now);

        db.execute(
            "INSERT INTO students (id, name, email, grade, birthday, enrolled_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                student.id,
                student.name,
                student.email,
                student.grade,
                student.birthday,
                enrolled_date
            ],
        )
        .map_err(|e| match e {
            // AUTOINCREMENT reports SQLITE_FULL once i64::MAX has been handed out
            rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::DiskFull => {
                StoreError::IdsExhausted
            }
            e => StoreError::from_sqlite(e, |constraint| match constraint {
                Constraint::IdPk => student.id.map(|id| id.to_string()).unwrap_or_default(),
                Constraint::GradeRange => student.grade.to_string(),
                Constraint::UniqueEmail | Constraint::EmailLength => student.email.clone(),
                Constraint::NameRequired => student.name.clone(),
            }),
        })?;

        Ok(Student {
            id: db.last_insert_rowid(),
            name: student.name,
            email: student.email,
            grade: student.grade,
            birthday: student.birthday,
            enrolled_date,
        })
    }

    fn update_with(db: &Connection, id: i64, changes: &StudentChanges) -> Result<Student> {
        let current = Self::get_with(db, id)?.ok_or(StoreError::NotFound(id))?;
        let updated = changes.apply_to(&current);

        Self::validate_fields(&updated.name, updated.grade, &updated.email)?;
        if updated.email != current.email {
            Self::validate_email_free(db, &updated.email, Some(id))?;
        }

        db.execute(
            "UPDATE students
             SET name = ?2, email = ?3, grade = ?4, birthday = ?5, enrolled_date = ?6
             WHERE id = ?1",
            params![
                id,
                updated.name,
                updated.email,
                updated.grade,
                updated.birthday,
                updated.enrolled_date
            ],
        )
        .map_err(|e| {
            StoreError::from_sqlite(e, |constraint| match constraint {
                Constraint::IdPk => id.to_string(),
                Constraint::GradeRange => updated.grade.to_string(),
                Constraint::UniqueEmail | Constraint::EmailLength => updated.email.clone(),
                Constraint::NameRequired => updated.name.clone(),
            })
        })?;

        Ok(updated)
    }

    fn get_with(db: &Connection, id: i64) -> Result<Option<Student>> {
        let sql = format!("SELECT {} FROM students WHERE id = ?1", STUDENT_COLUMNS);
        let student = db.query_row(&sql, [id], Self::student_from_row).optional()?;
        Ok(student)
    }

    fn query_with(db: &Connection, query: &Query) -> Result<Vec<Student>> {
        let (sql, params) = query.to_sql()?;
        debug!(sql = %sql, param_count = params.len(), "Running query");

        let mut stmt = db.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), Self::student_from_row)?;

        let mut results = Vec::new();
        for row_result in rows {
            results.push(row_result?);
        }

        Ok(results)
    }

    fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
        Ok(Student {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            grade: row.get(3)?,
            birthday: row.get(4)?,
            enrolled_date: row.get(5)?,
        })
    }

    fn validate_fields(name: &str, grade: i64, email: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(StoreError::violation(Constraint::NameRequired, name));
        }
        if !(GRADE_MIN..=GRADE_MAX).contains(&grade) {
            return Err(StoreError::violation(Constraint::GradeRange, grade));
        }
        if email.chars().count() > EMAIL_MAX_LEN {
            return Err(StoreError::violation(Constraint::EmailLength, email));
        }
        Ok(())
    }

    /// An explicit id must lie above every id handed out so far (deleted ones included),
    /// so id order stays insertion order.
    fn validate_explicit_id(db: &Connection, id: i64) -> Result<()> {
        let last_assigned: i64 = db.query_row(
            "SELECT COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'students'), 0)",
            [],
            |row| row.get(0),
        )?;

        if id <= last_assigned {
            return Err(StoreError::violation(Constraint::IdPk, id));
        }
        Ok(())
    }

    /// Email must not belong to any student other than `owner`
    fn validate_email_free(db: &Connection, email: &str, owner: Option<i64>) -> Result<()> {
        let holder: Option<i64> = db
            .query_row("SELECT id FROM students WHERE email = ?1", [email], |row| row.get(0))
            .optional()?;

        match holder {
            Some(id) if Some(id) != owner => Err(StoreError::violation(Constraint::UniqueEmail, email)),
            _ => Ok(()),
        }
    }
}
