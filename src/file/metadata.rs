//! Uploaded file metadata and repository.

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::db::DbPool;
use crate::Result;

/// Metadata for a stored document file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Unique file ID.
    pub id: i64,
    /// Submission this file belongs to.
    pub submission_id: i64,
    /// Folder holding the bytes.
    pub folder_id: i64,
    /// Storage-relative location: `<folder path>/<stored filename>`.
    pub file_url: String,
    /// Name as sent by the uploader.
    pub original_filename: String,
    /// Collision-free name on disk.
    pub stored_filename: String,
    /// Size in bytes.
    pub file_size: i64,
    pub mime_type: String,
    /// Position within the submission, starting at 0.
    pub file_order: i64,
    pub notes: Option<String>,
    pub uploader_id: i64,
    pub created_at: String,
}

/// Data for a new file row.
#[derive(Debug, Clone)]
pub struct NewUploadedFile {
    pub submission_id: i64,
    pub folder_id: i64,
    pub file_url: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_order: i64,
    pub notes: Option<String>,
    pub uploader_id: i64,
}

const FILE_COLUMNS: &str = "id, submission_id, folder_id, file_url, original_filename,
                            stored_filename, file_size, mime_type, file_order, notes,
                            uploader_id, created_at";

/// Repository for uploaded file rows.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<UploadedFile>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM uploaded_files WHERE id = ?");
        let file = sqlx::query_as::<_, UploadedFile>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(file)
    }

    /// Files stored in a folder.
    pub async fn list_by_folder(&self, folder_id: i64) -> Result<Vec<UploadedFile>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM uploaded_files
             WHERE folder_id = ? ORDER BY original_filename COLLATE NOCASE, id"
        );
        let files = sqlx::query_as::<_, UploadedFile>(&sql)
            .bind(folder_id)
            .fetch_all(self.pool)
            .await?;
        Ok(files)
    }

    /// Files of a submission in upload order.
    pub async fn list_by_submission(&self, submission_id: i64) -> Result<Vec<UploadedFile>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM uploaded_files WHERE submission_id = ? ORDER BY file_order, id"
        );
        let files = sqlx::query_as::<_, UploadedFile>(&sql)
            .bind(submission_id)
            .fetch_all(self.pool)
            .await?;
        Ok(files)
    }

    /// Files uploaded by a user.
    pub async fn list_by_uploader(&self, uploader_id: i64) -> Result<Vec<UploadedFile>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM uploaded_files WHERE uploader_id = ? ORDER BY id");
        let files = sqlx::query_as::<_, UploadedFile>(&sql)
            .bind(uploader_id)
            .fetch_all(self.pool)
            .await?;
        Ok(files)
    }

    /// Every file row.
    pub async fn list_all(&self) -> Result<Vec<UploadedFile>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM uploaded_files ORDER BY id");
        let files = sqlx::query_as::<_, UploadedFile>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(files)
    }

    /// Files of a submission, read through a caller-owned transaction.
    pub async fn list_by_submission_in(
        conn: &mut SqliteConnection,
        submission_id: i64,
    ) -> Result<Vec<UploadedFile>> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM uploaded_files WHERE submission_id = ? ORDER BY file_order, id"
        );
        let files = sqlx::query_as::<_, UploadedFile>(&sql)
            .bind(submission_id)
            .fetch_all(conn)
            .await?;
        Ok(files)
    }

    /// Insert a file row inside a caller-owned transaction.
    pub async fn insert_in(conn: &mut SqliteConnection, file: &NewUploadedFile) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO uploaded_files
                (submission_id, folder_id, file_url, original_filename, stored_filename,
                 file_size, mime_type, file_order, notes, uploader_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(file.submission_id)
        .bind(file.folder_id)
        .bind(&file.file_url)
        .bind(&file.original_filename)
        .bind(&file.stored_filename)
        .bind(file.file_size)
        .bind(&file.mime_type)
        .bind(file.file_order)
        .bind(&file.notes)
        .bind(file.uploader_id)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    /// Delete every file row of a submission.
    pub async fn delete_by_submission_in(
        conn: &mut SqliteConnection,
        submission_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM uploaded_files WHERE submission_id = ?")
            .bind(submission_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every file row stored in a folder.
    pub async fn delete_by_folder_in(conn: &mut SqliteConnection, folder_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM uploaded_files WHERE folder_id = ?")
            .bind(folder_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every file row uploaded by a user.
    pub async fn delete_by_uploader_in(conn: &mut SqliteConnection, uploader_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM uploaded_files WHERE uploader_id = ?")
            .bind(uploader_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::{DocumentType, SubmissionRepository};
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_insert_list_delete() {
        let fx = Fixture::new().await;
        let prof = fx.professor("PROF001", "Ada").await;
        let course = fx.course("CS101", "Intro").await;
        let assignment = fx.assign(&prof, &course).await;
        let folders = fx.provision_course(&prof, &course).await;
        let syllabus = &folders[1];

        let mut tx = fx.pool().begin().await.unwrap();
        let submission =
            SubmissionRepository::upsert_in(&mut tx, assignment.id, DocumentType::Syllabus, prof.id)
                .await
                .unwrap();
        for (order, name) in ["b.pdf", "A.pdf"].iter().enumerate() {
            FileRepository::insert_in(
                &mut tx,
                &NewUploadedFile {
                    submission_id: submission.id,
                    folder_id: syllabus.id,
                    file_url: format!("{}/{name}", syllabus.path),
                    original_filename: name.to_string(),
                    stored_filename: name.to_string(),
                    file_size: 10,
                    mime_type: "application/pdf".to_string(),
                    file_order: order as i64,
                    notes: None,
                    uploader_id: prof.id,
                },
            )
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let repo = FileRepository::new(fx.pool());
        let by_folder: Vec<_> = repo
            .list_by_folder(syllabus.id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.original_filename)
            .collect();
        assert_eq!(by_folder, vec!["A.pdf", "b.pdf"]);

        let by_submission = repo.list_by_submission(submission.id).await.unwrap();
        assert_eq!(by_submission[0].original_filename, "b.pdf");
        assert_eq!(repo.list_by_uploader(prof.id).await.unwrap().len(), 2);

        let mut conn = fx.pool().acquire().await.unwrap();
        assert_eq!(
            FileRepository::delete_by_submission_in(&mut conn, submission.id)
                .await
                .unwrap(),
            2
        );
        drop(conn);
        assert!(repo.list_all().await.unwrap().is_empty());
    }
}
