// Data models for the student roster

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Lowest grade accepted by `grade_between_1_and_12`
pub const GRADE_MIN: i64 = 1;
/// Highest grade accepted by `grade_between_1_and_12`
pub const GRADE_MAX: i64 = 12;
/// Maximum email length (in characters)
pub const EMAIL_MAX_LEN: usize = 55;

/// A stored student. Values returned by the store are snapshots, not live views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub grade: i64,
    pub birthday: Option<NaiveDateTime>,
    pub enrolled_date: NaiveDateTime,
}

impl std::fmt::Display for Student {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Student {}: {}, Grade {}", self.id, self.name, self.grade)
    }
}

/// Fields for inserting a student
///
/// `id` is normally left empty so the store assigns one; `enrolled_date`
/// defaults to the time of the insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub grade: i64,
    pub birthday: Option<NaiveDateTime>,
    pub enrolled_date: Option<NaiveDateTime>,
}

impl NewStudent {
    pub fn new(name: impl Into<String>, email: impl Into<String>, grade: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            grade,
            birthday: None,
            enrolled_date: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_birthday(mut self, birthday: NaiveDateTime) -> Self {
        self.birthday = Some(birthday);
        self
    }

    pub fn with_enrolled_date(mut self, enrolled_date: NaiveDateTime) -> Self {
        self.enrolled_date = Some(enrolled_date);
        self
    }
}

/// Field replacements for an update; `None` leaves the field as stored.
///
/// `birthday` is doubly optional so it can be cleared with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub grade: Option<i64>,
    pub birthday: Option<Option<NaiveDateTime>>,
    pub enrolled_date: Option<NaiveDateTime>,
}

impl StudentChanges {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn grade(mut self, grade: i64) -> Self {
        self.grade = Some(grade);
        self
    }

    pub fn birthday(mut self, birthday: Option<NaiveDateTime>) -> Self {
        self.birthday = Some(birthday);
        self
    }

    pub fn enrolled_date(mut self, enrolled_date: NaiveDateTime) -> Self {
        self.enrolled_date = Some(enrolled_date);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == StudentChanges::default()
    }

    /// Apply the changes to a copy of `student`
    pub fn apply_to(&self, student: &Student) -> Student {
        let mut updated = student.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(email) = &self.email {
            updated.email = email.clone();
        }
        if let Some(grade) = self.grade {
            updated.grade = grade;
        }
        if let Some(birthday) = self.birthday {
            updated.birthday = birthday;
        }
        if let Some(enrolled_date) = self.enrolled_date {
            updated.enrolled_date = enrolled_date;
        }
        updated
    }
}

/// Current local wall-clock time, evaluated on every call
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
