//! Document upload and download.
//!
//! An upload batch replaces the whole file set of its submission:
//!
//! 1. The batch is validated as a whole; any violation rejects every file.
//! 2. New bytes are written under collision-free names.
//! 3. One transaction deletes the old rows, inserts the new ones and marks
//!    the submission uploaded.
//! 4. Old bytes are removed after commit.
//!
//! A failure in steps 2 or 3 removes the bytes written by this batch, so no
//! row ever points at missing bytes written by a failed upload.

use std::collections::HashSet;

use tracing::{error, info, warn};

use super::access::{folder_capability, Principal};
use super::folder::{Folder, FolderRepository, FolderType};
use super::metadata::{FileRepository, NewUploadedFile, UploadedFile};
use super::path;
use super::storage::{extract_extension, FileStorage};
use crate::academic::CourseAssignmentRepository;
use crate::config::StorageConfig;
use crate::db::DbPool;
use crate::error::FileViolation;
use crate::submission::{DocumentRequirement, DocumentType, RequirementRepository, SubmissionRepository};
use crate::{ArchiveError, Result};

/// Fallback MIME type for unknown content.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Batch-level entries in a violation list use this in place of a filename.
const BATCH: &str = "(batch)";

/// One file of an upload batch.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Name as sent by the client.
    pub filename: String,
    pub content: Vec<u8>,
}

impl IncomingFile {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }
}

/// Upload target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRef {
    Id(i64),
    Path(String),
}

/// Request data for an upload batch.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub target: FolderRef,
    pub files: Vec<IncomingFile>,
    pub notes: Option<String>,
}

impl UploadRequest {
    pub fn new(target: FolderRef, files: Vec<IncomingFile>) -> Self {
        Self {
            target,
            files,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Result of a file download.
#[derive(Debug)]
pub struct DownloadResult {
    pub metadata: UploadedFile,
    pub content: Vec<u8>,
    /// MIME type to send, never empty.
    pub content_type: String,
}

/// Constraints one batch is validated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    /// Lowercase extensions without dot.
    pub allowed_extensions: Vec<String>,
    pub max_file_count: usize,
    pub max_total_bytes: u64,
}

impl UploadLimits {
    /// Defaults used when a course has no requirement row.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            max_file_count: config.max_file_count,
            max_total_bytes: config.max_total_size_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    fn from_requirement(requirement: &DocumentRequirement) -> Self {
        Self {
            allowed_extensions: requirement.extensions(),
            max_file_count: usize::try_from(requirement.max_file_count).unwrap_or(0),
            max_total_bytes: u64::try_from(requirement.max_total_size_mb)
                .unwrap_or(0)
                .saturating_mul(BYTES_PER_MB),
        }
    }

    /// Check a batch, collecting every violation.
    pub fn validate(&self, files: &[IncomingFile]) -> Vec<FileViolation> {
        let mut violations = Vec::new();

        for file in files {
            match extract_extension(&file.filename) {
                Some(ext) if self.allowed_extensions.contains(&ext) => {}
                Some(ext) => violations.push(FileViolation::new(
                    &file.filename,
                    format!(
                        "extension .{ext} is not allowed (allowed: {})",
                        self.allowed_extensions.join(", ")
                    ),
                )),
                None => violations.push(FileViolation::new(&file.filename, "file has no extension")),
            }
            if file.content.is_empty() {
                violations.push(FileViolation::new(&file.filename, "file is empty"));
            }
        }

        if files.len() > self.max_file_count {
            violations.push(FileViolation::new(
                BATCH,
                format!(
                    "{} files exceed the maximum of {}",
                    files.len(),
                    self.max_file_count
                ),
            ));
        }

        let total: u64 = files.iter().map(|f| f.content.len() as u64).sum();
        if total > self.max_total_bytes {
            violations.push(FileViolation::new(
                BATCH,
                format!(
                    "total size {total} bytes exceeds the maximum of {} MB",
                    self.max_total_bytes / BYTES_PER_MB
                ),
            ));
        }

        violations
    }
}

/// MIME type for a filename, falling back to [`DEFAULT_MIME_TYPE`].
pub fn resolve_mime_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

/// A file written to disk by the current batch, not yet committed.
struct Written {
    original: String,
    stored: String,
    size: i64,
}

/// Upload and download of submission files.
pub struct FileUploadService<'a> {
    pool: &'a DbPool,
    storage: &'a FileStorage,
    defaults: &'a UploadLimits,
}

impl<'a> FileUploadService<'a> {
    pub fn new(pool: &'a DbPool, storage: &'a FileStorage, defaults: &'a UploadLimits) -> Self {
        Self {
            pool,
            storage,
            defaults,
        }
    }

    /// Upload a batch into a document subfolder, replacing the previous
    /// file set of the same submission.
    ///
    /// Returns the new file rows in upload order.
    pub async fn upload_files(
        &self,
        request: &UploadRequest,
        principal: &Principal,
    ) -> Result<Vec<UploadedFile>> {
        let folder = self.resolve_folder(&request.target).await?;

        let capability = folder_capability(self.pool, principal, &folder).await?;
        if !capability.write {
            return Err(ArchiveError::Forbidden(format!(
                "no write access to {}",
                folder.path
            )));
        }

        if request.files.is_empty() {
            return Err(ArchiveError::Validation("no files provided".to_string()));
        }

        let target = self.resolve_target(&folder).await?;

        let limits = match RequirementRepository::new(self.pool)
            .find(target.course_id, target.document_type)
            .await?
        {
            Some(requirement) => UploadLimits::from_requirement(&requirement),
            None => self.defaults.clone(),
        };
        let violations = limits.validate(&request.files);
        if !violations.is_empty() {
            info!(
                path = %folder.path,
                rejected = violations.len(),
                "Upload batch rejected"
            );
            return Err(ArchiveError::ValidationFailed(violations));
        }

        let reserved: HashSet<String> = FileRepository::new(self.pool)
            .list_by_folder(folder.id)
            .await?
            .into_iter()
            .map(|f| f.stored_filename)
            .collect();
        let written = self.write_batch(&folder, &request.files, reserved)?;

        match self
            .replace_rows(&folder, &target, &written, request.notes.as_deref(), principal)
            .await
        {
            Ok((submission_id, replaced)) => {
                let kept: HashSet<&str> = written.iter().map(|w| w.stored.as_str()).collect();
                for old in replaced.iter().filter(|old| {
                    old.folder_id != folder.id || !kept.contains(old.stored_filename.as_str())
                }) {
                    if let Err(e) = self.storage.delete(&old.file_url) {
                        warn!(file_url = %old.file_url, error = %e, "Failed to delete replaced file");
                    }
                }
                info!(
                    path = %folder.path,
                    submission_id,
                    files = written.len(),
                    replaced = replaced.len(),
                    "Upload stored"
                );
                FileRepository::new(self.pool)
                    .list_by_submission(submission_id)
                    .await
            }
            Err(e) => {
                error!(path = %folder.path, error = %e, "Upload transaction failed");
                self.discard(&folder, &written);
                Err(e)
            }
        }
    }

    /// File metadata, if the principal may read its folder.
    pub async fn get_file(&self, file_id: i64, principal: &Principal) -> Result<UploadedFile> {
        let file = FileRepository::new(self.pool)
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("file {file_id}")))?;
        let folder = FolderRepository::new(self.pool)
            .get_by_id(file.folder_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("folder {}", file.folder_id)))?;

        if !folder_capability(self.pool, principal, &folder).await?.read {
            return Err(ArchiveError::Forbidden(format!("no read access to file {file_id}")));
        }
        Ok(file)
    }

    /// File metadata and bytes.
    ///
    /// A row whose bytes are missing is a [`ArchiveError::Storage`] error.
    pub async fn download(&self, file_id: i64, principal: &Principal) -> Result<DownloadResult> {
        let metadata = self.get_file(file_id, principal).await?;
        let content = self.storage.read(&metadata.file_url)?;
        let content_type = if metadata.mime_type.trim().is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            metadata.mime_type.clone()
        };
        Ok(DownloadResult {
            metadata,
            content,
            content_type,
        })
    }

    async fn resolve_folder(&self, target: &FolderRef) -> Result<Folder> {
        let repo = FolderRepository::new(self.pool);
        let folder = match target {
            FolderRef::Id(id) => repo.get_by_id(*id).await?,
            FolderRef::Path(p) => repo.get_by_path(p).await?,
        };
        folder.ok_or_else(|| match target {
            FolderRef::Id(id) => ArchiveError::NotFound(format!("folder {id}")),
            FolderRef::Path(p) => ArchiveError::NotFound(format!("folder {}", path::normalize(p))),
        })
    }

    /// Document type, course and assignment behind a subfolder.
    async fn resolve_target(&self, folder: &Folder) -> Result<UploadTarget> {
        if folder.folder_type != FolderType::Subfolder {
            return Err(ArchiveError::Validation(format!(
                "{} is not a document folder",
                folder.path
            )));
        }
        let document_type = DocumentType::from_folder_name(&folder.name).ok_or_else(|| {
            ArchiveError::Validation(format!("{} is not a document folder", folder.path))
        })?;

        let course_folder = match path::parent(&folder.path) {
            Some(parent) => FolderRepository::new(self.pool).get_by_path(parent).await?,
            None => None,
        }
        .ok_or_else(|| ArchiveError::NotFound(format!("course folder of {}", folder.path)))?;
        let course_id = course_folder
            .course_id
            .ok_or_else(|| ArchiveError::NotFound(format!("course of {}", course_folder.path)))?;
        let professor_id = folder
            .owner_id
            .ok_or_else(|| ArchiveError::NotFound(format!("owner of {}", folder.path)))?;

        let assignment = CourseAssignmentRepository::new(self.pool)
            .find(folder.semester_id, course_id, professor_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("course assignment for {}", folder.path)))?;

        Ok(UploadTarget {
            document_type,
            course_id,
            professor_id,
            assignment_id: assignment.id,
        })
    }

    /// Write every file under a name not on disk and not in `reserved`.
    /// On failure, removes what this call wrote.
    fn write_batch(
        &self,
        folder: &Folder,
        files: &[IncomingFile],
        mut reserved: HashSet<String>,
    ) -> Result<Vec<Written>> {
        let mut written = Vec::with_capacity(files.len());

        for file in files {
            let stored = self.storage.unique_name(&folder.path, &file.filename, &reserved);
            if let Err(e) = self.storage.write(&folder.path, &stored, &file.content) {
                error!(path = %folder.path, file = %stored, error = %e, "Failed to write upload");
                self.discard(folder, &written);
                return Err(e);
            }
            reserved.insert(stored.clone());
            written.push(Written {
                original: file.filename.clone(),
                stored,
                size: file.content.len() as i64,
            });
        }
        Ok(written)
    }

    /// Swap the submission's rows in one transaction.
    ///
    /// Returns the submission id and the replaced rows.
    async fn replace_rows(
        &self,
        folder: &Folder,
        target: &UploadTarget,
        written: &[Written],
        notes: Option<&str>,
        principal: &Principal,
    ) -> Result<(i64, Vec<UploadedFile>)> {
        let mut tx = self.pool.begin().await?;

        let submission = SubmissionRepository::upsert_in(
            &mut tx,
            target.assignment_id,
            target.document_type,
            target.professor_id,
        )
        .await?;

        let replaced = FileRepository::list_by_submission_in(&mut tx, submission.id).await?;
        FileRepository::delete_by_submission_in(&mut tx, submission.id).await?;

        let mut total_size = 0;
        for (order, file) in written.iter().enumerate() {
            FileRepository::insert_in(
                &mut tx,
                &NewUploadedFile {
                    submission_id: submission.id,
                    folder_id: folder.id,
                    file_url: format!("{}/{}", folder.path, file.stored),
                    original_filename: file.original.clone(),
                    stored_filename: file.stored.clone(),
                    file_size: file.size,
                    mime_type: resolve_mime_type(&file.original),
                    file_order: order as i64,
                    notes: notes.map(str::to_string),
                    uploader_id: principal.user_id,
                },
            )
            .await?;
            total_size += file.size;
        }

        SubmissionRepository::mark_uploaded_in(
            &mut tx,
            submission.id,
            written.len() as i64,
            total_size,
            notes,
        )
        .await?;

        tx.commit().await?;
        Ok((submission.id, replaced))
    }

    fn discard(&self, folder: &Folder, written: &[Written]) {
        for file in written {
            if let Err(e) = self.storage.delete(&format!("{}/{}", folder.path, file.stored)) {
                warn!(path = %folder.path, file = %file.stored, error = %e, "Failed to discard upload");
            }
        }
    }
}

struct UploadTarget {
    document_type: DocumentType,
    course_id: i64,
    professor_id: i64,
    assignment_id: i64,
}
