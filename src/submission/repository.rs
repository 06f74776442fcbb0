//! Submission and requirement repositories.
//!
//! Writes that belong to an upload or a cascade take a caller-owned
//! connection so they can share one transaction.

use sqlx::SqliteConnection;

use super::types::{
    DocumentRequirement, DocumentSubmission, DocumentType, NewRequirement, SubmissionStatus,
};
use crate::db::DbPool;
use crate::{ArchiveError, Result};

const REQUIREMENT_COLUMNS: &str = "id, course_id, document_type, allowed_extensions,
                                   max_file_count, max_total_size_mb, deadline, is_required";

/// Repository for document requirements.
pub struct RequirementRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RequirementRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a requirement.
    pub async fn create(&self, req: &NewRequirement) -> Result<DocumentRequirement> {
        sqlx::query(
            "INSERT INTO document_requirements
                (course_id, document_type, allowed_extensions, max_file_count, max_total_size_mb, deadline)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(req.course_id)
        .bind(req.document_type.as_str())
        .bind(req.allowed_extensions.join(","))
        .bind(req.max_file_count)
        .bind(req.max_total_size_mb)
        .bind(&req.deadline)
        .execute(self.pool)
        .await?;

        self.find(req.course_id, req.document_type)
            .await?
            .ok_or_else(|| ArchiveError::NotFound("document requirement".to_string()))
    }

    /// Requirement for a course and document type, if configured.
    pub async fn find(
        &self,
        course_id: i64,
        document_type: DocumentType,
    ) -> Result<Option<DocumentRequirement>> {
        let sql = format!(
            "SELECT {REQUIREMENT_COLUMNS} FROM document_requirements
             WHERE course_id = ? AND document_type = ?"
        );
        let req = sqlx::query_as::<_, DocumentRequirement>(&sql)
            .bind(course_id)
            .bind(document_type.as_str())
            .fetch_optional(self.pool)
            .await?;
        Ok(req)
    }

    /// Delete all requirements of a course.
    pub async fn delete_by_course_in(conn: &mut SqliteConnection, course_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM document_requirements WHERE course_id = ?")
            .bind(course_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

const SUBMISSION_COLUMNS: &str = "id, course_assignment_id, document_type, professor_id, status,
                                  file_count, total_file_size, notes, submitted_at, created_at,
                                  updated_at";

/// Repository for document submissions.
pub struct SubmissionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SubmissionRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a submission by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<DocumentSubmission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM document_submissions WHERE id = ?");
        let submission = sqlx::query_as::<_, DocumentSubmission>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(submission)
    }

    /// Submission for an assignment and document type.
    pub async fn find(
        &self,
        course_assignment_id: i64,
        document_type: DocumentType,
    ) -> Result<Option<DocumentSubmission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM document_submissions
             WHERE course_assignment_id = ? AND document_type = ?"
        );
        let submission = sqlx::query_as::<_, DocumentSubmission>(&sql)
            .bind(course_assignment_id)
            .bind(document_type.as_str())
            .fetch_optional(self.pool)
            .await?;
        Ok(submission)
    }

    /// Submissions touching a user: made by them or attached to one of
    /// their assignments.
    pub async fn list_for_professor(&self, professor_id: i64) -> Result<Vec<DocumentSubmission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM document_submissions
             WHERE professor_id = ?
                OR course_assignment_id IN (SELECT id FROM course_assignments WHERE professor_id = ?)
             ORDER BY id"
        );
        let submissions = sqlx::query_as::<_, DocumentSubmission>(&sql)
            .bind(professor_id)
            .bind(professor_id)
            .fetch_all(self.pool)
            .await?;
        Ok(submissions)
    }

    /// Submissions attached to a course's assignments.
    pub async fn list_for_course(&self, course_id: i64) -> Result<Vec<DocumentSubmission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM document_submissions
             WHERE course_assignment_id IN (SELECT id FROM course_assignments WHERE course_id = ?)
             ORDER BY id"
        );
        let submissions = sqlx::query_as::<_, DocumentSubmission>(&sql)
            .bind(course_id)
            .fetch_all(self.pool)
            .await?;
        Ok(submissions)
    }

    /// Get or create the submission row inside a transaction.
    pub async fn upsert_in(
        conn: &mut SqliteConnection,
        course_assignment_id: i64,
        document_type: DocumentType,
        professor_id: i64,
    ) -> Result<DocumentSubmission> {
        sqlx::query(
            "INSERT INTO document_submissions (course_assignment_id, document_type, professor_id)
             VALUES (?, ?, ?)
             ON CONFLICT (course_assignment_id, document_type) DO NOTHING",
        )
        .bind(course_assignment_id)
        .bind(document_type.as_str())
        .bind(professor_id)
        .execute(&mut *conn)
        .await?;

        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM document_submissions
             WHERE course_assignment_id = ? AND document_type = ?"
        );
        let submission = sqlx::query_as::<_, DocumentSubmission>(&sql)
            .bind(course_assignment_id)
            .bind(document_type.as_str())
            .fetch_one(&mut *conn)
            .await?;
        Ok(submission)
    }

    /// Record a completed upload: status, counters, notes and timestamps.
    pub async fn mark_uploaded_in(
        conn: &mut SqliteConnection,
        id: i64,
        file_count: i64,
        total_file_size: i64,
        notes: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE document_submissions
             SET status = ?, file_count = ?, total_file_size = ?, notes = ?,
                 submitted_at = datetime('now'), updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(SubmissionStatus::Uploaded.as_str())
        .bind(file_count)
        .bind(total_file_size)
        .bind(notes)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Delete a submission row. Its files must be gone already.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM document_submissions WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
