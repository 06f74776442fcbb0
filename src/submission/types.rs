//! Submission entities.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime;

/// Document category. Each maps to exactly one standard subfolder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Syllabus,
    Exam,
    CourseNotes,
    Assignment,
}

impl DocumentType {
    /// All types, in subfolder creation order.
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Syllabus,
        DocumentType::Exam,
        DocumentType::CourseNotes,
        DocumentType::Assignment,
    ];

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Syllabus => "SYLLABUS",
            DocumentType::Exam => "EXAM",
            DocumentType::CourseNotes => "COURSE_NOTES",
            DocumentType::Assignment => "ASSIGNMENT",
        }
    }

    /// Name of the subfolder holding this type under a course folder.
    pub fn folder_name(&self) -> &'static str {
        match self {
            DocumentType::Syllabus => "Syllabus",
            DocumentType::Exam => "Exams",
            DocumentType::CourseNotes => "Course Notes",
            DocumentType::Assignment => "Assignments",
        }
    }

    /// Reverse of [`DocumentType::folder_name`].
    pub fn from_folder_name(name: &str) -> Option<DocumentType> {
        Self::ALL.into_iter().find(|t| t.folder_name() == name)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown document type: {s}"))
    }
}

impl TryFrom<String> for DocumentType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Submission status. Only `NotUploaded` and `Uploaded` are stored;
/// `Overdue` is derived when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    NotUploaded,
    Uploaded,
    Overdue,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::NotUploaded => "NOT_UPLOADED",
            SubmissionStatus::Uploaded => "UPLOADED",
            SubmissionStatus::Overdue => "OVERDUE",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_UPLOADED" => Ok(SubmissionStatus::NotUploaded),
            "UPLOADED" => Ok(SubmissionStatus::Uploaded),
            "OVERDUE" => Ok(SubmissionStatus::Overdue),
            _ => Err(format!("unknown submission status: {s}")),
        }
    }
}

impl TryFrom<String> for SubmissionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Derive the status shown to readers.
///
/// A submission without files is overdue once the deadline has passed.
pub fn effective_status(
    stored: SubmissionStatus,
    deadline: Option<&str>,
    now: DateTime<Utc>,
) -> SubmissionStatus {
    match (stored, deadline.and_then(datetime::parse_stored)) {
        (SubmissionStatus::NotUploaded, Some(deadline)) if now > deadline => {
            SubmissionStatus::Overdue
        }
        (status, _) => status,
    }
}

/// The file set for one (course assignment, document type).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentSubmission {
    pub id: i64,
    pub course_assignment_id: i64,
    #[sqlx(try_from = "String")]
    pub document_type: DocumentType,
    pub professor_id: i64,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    pub file_count: i64,
    pub total_file_size: i64,
    pub notes: Option<String>,
    pub submitted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Upload constraints for one document type of one course.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRequirement {
    pub id: i64,
    pub course_id: i64,
    #[sqlx(try_from = "String")]
    pub document_type: DocumentType,
    /// Comma separated lowercase extensions.
    pub allowed_extensions: String,
    pub max_file_count: i64,
    pub max_total_size_mb: i64,
    pub deadline: Option<String>,
    pub is_required: bool,
}

impl DocumentRequirement {
    /// Allowed extensions as a list, lowercased and without dots.
    pub fn extensions(&self) -> Vec<String> {
        self.allowed_extensions
            .split(',')
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

/// Data for creating a requirement.
#[derive(Debug, Clone)]
pub struct NewRequirement {
    pub course_id: i64,
    pub document_type: DocumentType,
    pub allowed_extensions: Vec<String>,
    pub max_file_count: i64,
    pub max_total_size_mb: i64,
    pub deadline: Option<String>,
}

impl NewRequirement {
    pub fn new(course_id: i64, document_type: DocumentType) -> Self {
        Self {
            course_id,
            document_type,
            allowed_extensions: vec!["pdf".to_string()],
            max_file_count: 5,
            max_total_size_mb: 50,
            deadline: None,
        }
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.allowed_extensions = extensions.iter().map(|e| e.to_lowercase()).collect();
        self
    }

    pub fn with_limits(mut self, max_file_count: i64, max_total_size_mb: i64) -> Self {
        self.max_file_count = max_file_count;
        self.max_total_size_mb = max_total_size_mb;
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }
}
