//! Academic catalogue entities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A department.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub shortcut: Option<String>,
    pub created_at: String,
}

/// An academic year such as `2024-2025`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AcademicYear {
    pub id: i64,
    /// Code used as the first path segment.
    pub year_code: String,
    pub start_year: i64,
    pub end_year: i64,
    pub is_active: bool,
    pub created_at: String,
}

/// Semester kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemesterType {
    First,
    Second,
    Summer,
}

impl SemesterType {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SemesterType::First => "FIRST",
            SemesterType::Second => "SECOND",
            SemesterType::Summer => "SUMMER",
        }
    }

    /// Lower-cased form used as a path segment.
    pub fn path_segment(&self) -> &'static str {
        match self {
            SemesterType::First => "first",
            SemesterType::Second => "second",
            SemesterType::Summer => "summer",
        }
    }
}

impl fmt::Display for SemesterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SemesterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FIRST" => Ok(SemesterType::First),
            "SECOND" => Ok(SemesterType::Second),
            "SUMMER" => Ok(SemesterType::Summer),
            _ => Err(format!("unknown semester type: {s}")),
        }
    }
}

impl TryFrom<String> for SemesterType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A semester within an academic year.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Semester {
    pub id: i64,
    pub academic_year_id: i64,
    #[sqlx(try_from = "String")]
    pub semester_type: SemesterType,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A course in the catalogue.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub course_code: String,
    pub course_name: String,
    pub department_id: i64,
    pub level: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

/// A professor teaching a course in a semester.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CourseAssignment {
    pub id: i64,
    pub semester_id: i64,
    pub course_id: i64,
    pub professor_id: i64,
    pub created_at: String,
}

/// Data for creating a new course.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub course_code: String,
    pub course_name: String,
    pub department_id: i64,
    pub level: Option<String>,
}

impl NewCourse {
    /// Create a new course definition.
    pub fn new(
        course_code: impl Into<String>,
        course_name: impl Into<String>,
        department_id: i64,
    ) -> Self {
        Self {
            course_code: course_code.into(),
            course_name: course_name.into(),
            department_id,
            level: None,
        }
    }

    /// Set the course level.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semester_type_forms() {
        assert_eq!(SemesterType::First.as_str(), "FIRST");
        assert_eq!(SemesterType::First.path_segment(), "first");
        assert_eq!(SemesterType::Summer.path_segment(), "summer");
        assert_eq!("second".parse::<SemesterType>().unwrap(), SemesterType::Second);
        assert!("winter".parse::<SemesterType>().is_err());
    }
}
