//! Cascading deletion of users and departments.
//!
//! For each owner the work runs in two phases:
//!
//! 1. Disk: stored files, then folder directories deepest path first.
//!    Errors are logged and recorded in the report; they never stop the
//!    deletion.
//! 2. Database, in one transaction: file rows, submissions, assignments,
//!    folders deepest path first, refresh tokens, and finally the owner row.
//!
//! The metadata store is authoritative. Whatever disk content survives a
//! failed delete is reported here and picked up by the storage reconciler.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use super::folder::{sort_deepest_first, Folder, FolderRepository};
use super::metadata::{FileRepository, UploadedFile};
use super::storage::FileStorage;
use crate::academic::{Course, CourseAssignmentRepository, CourseRepository, DepartmentRepository};
use crate::db::{DbPool, RefreshTokenRepository, UserRepository};
use crate::submission::{RequirementRepository, SubmissionRepository};
use crate::{ArchiveError, Result};

/// What deleting a user would remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionInfo {
    pub user_id: i64,
    pub folder_count: usize,
    pub file_count: usize,
    pub total_bytes: i64,
    pub assignment_count: usize,
    pub submission_count: usize,
}

/// What a cascade removed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub users_deleted: usize,
    pub courses_deleted: usize,
    pub folders_deleted: usize,
    pub files_deleted: usize,
    pub submissions_deleted: usize,
    pub assignments_deleted: usize,
    /// Disk operations that failed. Their rows were deleted anyway.
    pub disk_errors: Vec<String>,
}

impl DeletionReport {
    fn absorb(&mut self, other: DeletionReport) {
        self.users_deleted += other.users_deleted;
        self.courses_deleted += other.courses_deleted;
        self.folders_deleted += other.folders_deleted;
        self.files_deleted += other.files_deleted;
        self.submissions_deleted += other.submissions_deleted;
        self.assignments_deleted += other.assignments_deleted;
        self.disk_errors.extend(other.disk_errors);
    }
}

/// Everything depending on one owner, collected before anything is deleted.
#[derive(Default)]
struct Plan {
    files: BTreeMap<i64, UploadedFile>,
    submission_ids: Vec<i64>,
    assignment_ids: Vec<i64>,
    /// Deepest path first.
    folders: Vec<Folder>,
}

/// Deletes owners together with their folders, files and submissions.
pub struct CascadeDeleter<'a> {
    pool: &'a DbPool,
    storage: &'a FileStorage,
}

impl<'a> CascadeDeleter<'a> {
    pub fn new(pool: &'a DbPool, storage: &'a FileStorage) -> Self {
        Self { pool, storage }
    }

    /// Preview of [`CascadeDeleter::delete_user`]. Changes nothing.
    pub async fn deletion_info(&self, user_id: i64) -> Result<DeletionInfo> {
        UserRepository::new(self.pool)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("user {user_id}")))?;
        let plan = self.plan_user(user_id).await?;

        Ok(DeletionInfo {
            user_id,
            folder_count: plan.folders.len(),
            file_count: plan.files.len(),
            total_bytes: plan.files.values().map(|f| f.file_size).sum(),
            assignment_count: plan.assignment_ids.len(),
            submission_count: plan.submission_ids.len(),
        })
    }

    /// Delete a user with everything they own.
    pub async fn delete_user(&self, user_id: i64) -> Result<DeletionReport> {
        UserRepository::new(self.pool)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("user {user_id}")))?;

        let plan = self.plan_user(user_id).await?;
        let mut report = DeletionReport::default();
        self.remove_from_disk(&plan, &mut report);

        let mut tx = self.pool.begin().await?;
        delete_rows(&mut tx, &plan, &mut report).await?;
        RefreshTokenRepository::delete_by_user_in(&mut tx, user_id).await?;
        UserRepository::delete_in(&mut tx, user_id).await?;
        tx.commit().await?;

        report.users_deleted = 1;
        info!(
            user_id,
            folders = report.folders_deleted,
            files = report.files_deleted,
            disk_errors = report.disk_errors.len(),
            "Deleted user"
        );
        Ok(report)
    }

    /// Delete a department: its users, then its courses, then the
    /// department row.
    pub async fn delete_department(&self, department_id: i64) -> Result<DeletionReport> {
        DepartmentRepository::new(self.pool)
            .get_by_id(department_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("department {department_id}")))?;

        let mut report = DeletionReport::default();

        for user in UserRepository::new(self.pool)
            .list_by_department(department_id)
            .await?
        {
            report.absorb(self.delete_user(user.id).await?);
        }

        for course in CourseRepository::new(self.pool)
            .list_by_department(department_id)
            .await?
        {
            report.absorb(self.delete_course(&course).await?);
        }

        let mut tx = self.pool.begin().await?;
        DepartmentRepository::delete_in(&mut tx, department_id).await?;
        tx.commit().await?;

        info!(
            department_id,
            users = report.users_deleted,
            courses = report.courses_deleted,
            folders = report.folders_deleted,
            files = report.files_deleted,
            disk_errors = report.disk_errors.len(),
            "Deleted department"
        );
        Ok(report)
    }

    async fn delete_course(&self, course: &Course) -> Result<DeletionReport> {
        let plan = self.plan_course(course.id).await?;
        let mut report = DeletionReport::default();
        self.remove_from_disk(&plan, &mut report);

        let mut tx = self.pool.begin().await?;
        delete_rows(&mut tx, &plan, &mut report).await?;
        RequirementRepository::delete_by_course_in(&mut tx, course.id).await?;
        CourseRepository::delete_in(&mut tx, course.id).await?;
        tx.commit().await?;

        report.courses_deleted = 1;
        info!(course_id = course.id, course_code = %course.course_code, "Deleted course");
        Ok(report)
    }

    async fn plan_user(&self, user_id: i64) -> Result<Plan> {
        let owned = FolderRepository::new(self.pool).list_by_owner(user_id).await?;
        let mut plan = Plan {
            folders: self.with_descendants(owned).await?,
            ..Plan::default()
        };

        let submissions = SubmissionRepository::new(self.pool)
            .list_for_professor(user_id)
            .await?;
        plan.submission_ids = submissions.iter().map(|s| s.id).collect();
        plan.assignment_ids = CourseAssignmentRepository::new(self.pool)
            .list_by_professor_or_course(Some(user_id), None)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();

        let files = FileRepository::new(self.pool);
        add_files(&mut plan, files.list_by_uploader(user_id).await?);
        self.collect_files(&mut plan).await?;
        Ok(plan)
    }

    async fn plan_course(&self, course_id: i64) -> Result<Plan> {
        let course_folders = FolderRepository::new(self.pool).list_by_course(course_id).await?;
        let mut plan = Plan {
            folders: self.with_descendants(course_folders).await?,
            ..Plan::default()
        };

        plan.submission_ids = SubmissionRepository::new(self.pool)
            .list_for_course(course_id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        plan.assignment_ids = CourseAssignmentRepository::new(self.pool)
            .list_by_professor_or_course(None, Some(course_id))
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();

        self.collect_files(&mut plan).await?;
        Ok(plan)
    }

    /// Add the files of every planned submission and folder.
    async fn collect_files(&self, plan: &mut Plan) -> Result<()> {
        let files = FileRepository::new(self.pool);
        for submission_id in plan.submission_ids.clone() {
            add_files(plan, files.list_by_submission(submission_id).await?);
        }
        for folder_id in plan.folders.iter().map(|f| f.id).collect::<Vec<_>>() {
            add_files(plan, files.list_by_folder(folder_id).await?);
        }
        Ok(())
    }

    /// The given folders plus everything below them, deepest first.
    async fn with_descendants(&self, folders: Vec<Folder>) -> Result<Vec<Folder>> {
        let repo = FolderRepository::new(self.pool);
        let mut by_id = BTreeMap::new();
        for folder in folders {
            for descendant in repo.list_descendants(&folder.path).await? {
                by_id.insert(descendant.id, descendant);
            }
            by_id.insert(folder.id, folder);
        }
        let mut all: Vec<Folder> = by_id.into_values().collect();
        sort_deepest_first(&mut all);
        Ok(all)
    }

    fn remove_from_disk(&self, plan: &Plan, report: &mut DeletionReport) {
        for file in plan.files.values() {
            if let Err(e) = self.storage.delete(&file.file_url) {
                warn!(file_url = %file.file_url, error = %e, "Failed to delete stored file");
                report.disk_errors.push(format!("{}: {e}", file.file_url));
            }
        }
        for folder in &plan.folders {
            if let Err(e) = self.storage.remove_dir_all(&folder.path) {
                warn!(path = %folder.path, error = %e, "Failed to remove folder directory");
                report.disk_errors.push(format!("{}: {e}", folder.path));
            }
        }
    }
}

fn add_files(plan: &mut Plan, files: Vec<UploadedFile>) {
    for file in files {
        plan.files.insert(file.id, file);
    }
}

/// Delete the planned rows in dependency order.
async fn delete_rows(
    conn: &mut SqliteConnection,
    plan: &Plan,
    report: &mut DeletionReport,
) -> Result<()> {
    for &file_id in plan.files.keys() {
        sqlx::query("DELETE FROM uploaded_files WHERE id = ?")
            .bind(file_id)
            .execute(&mut *conn)
            .await?;
    }
    report.files_deleted += plan.files.len();

    for &submission_id in &plan.submission_ids {
        FileRepository::delete_by_submission_in(&mut *conn, submission_id).await?;
        if SubmissionRepository::delete_in(&mut *conn, submission_id).await? {
            report.submissions_deleted += 1;
        }
    }

    for &assignment_id in &plan.assignment_ids {
        if CourseAssignmentRepository::delete_in(&mut *conn, assignment_id).await? {
            report.assignments_deleted += 1;
        }
    }

    for folder in &plan.folders {
        FileRepository::delete_by_folder_in(&mut *conn, folder.id).await?;
        if FolderRepository::delete_in(&mut *conn, folder).await? {
            report.folders_deleted += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::db::{NewRefreshToken, Role};
    use crate::file::access::Principal;
    use crate::file::upload::{FileUploadService, FolderRef, IncomingFile, UploadLimits, UploadRequest};
    use crate::test_support::Fixture;

    async fn upload(fx: &Fixture, owner: &Principal, folder: &Folder, names: &[&str]) -> Vec<UploadedFile> {
        let limits = UploadLimits::from_config(&StorageConfig::default());
        let request = UploadRequest::new(
            FolderRef::Id(folder.id),
            names
                .iter()
                .map(|n| IncomingFile::new(*n, vec![b'x'; 10]))
                .collect(),
        );
        FileUploadService::new(fx.pool(), fx.storage(), &limits)
            .upload_files(&request, owner)
            .await
            .unwrap()
    }

    async fn count(fx: &Fixture, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(fx.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_deletion_info_and_delete_user() {
        let fx = Fixture::new().await;
        let prof = fx.professor("PROF001", "Ada").await;
        let course = fx.course("CS101", "Intro").await;
        fx.assign(&prof, &course).await;
        let folders = fx.provision_course(&prof, &course).await;
        let owner = Fixture::principal(&prof);
        upload(&fx, &owner, &folders[1], &["a.pdf", "b.pdf"]).await;
        upload(&fx, &owner, &folders[2], &["exam.pdf"]).await;
        RefreshTokenRepository::new(fx.pool())
            .create(&NewRefreshToken {
                user_id: prof.id,
                token: "token-hash".to_string(),
                expires_at: "2099-01-01 00:00:00".to_string(),
            })
            .await
            .unwrap();

        let deleter = CascadeDeleter::new(fx.pool(), fx.storage());
        let info = deleter.deletion_info(prof.id).await.unwrap();
        assert_eq!(
            info,
            DeletionInfo {
                user_id: prof.id,
                folder_count: 6,
                file_count: 3,
                total_bytes: 30,
                assignment_count: 1,
                submission_count: 2,
            }
        );

        let report = deleter.delete_user(prof.id).await.unwrap();
        assert_eq!(report.users_deleted, 1);
        assert_eq!(report.folders_deleted, 6);
        assert_eq!(report.files_deleted, 3);
        assert_eq!(report.submissions_deleted, 2);
        assert_eq!(report.assignments_deleted, 1);
        assert!(report.disk_errors.is_empty());

        for table in ["folders", "uploaded_files", "document_submissions", "course_assignments", "refresh_tokens"] {
            assert_eq!(count(&fx, table).await, 0, "{table}");
        }
        assert!(UserRepository::new(fx.pool()).get_by_id(prof.id).await.unwrap().is_none());
        assert!(!fx.storage().dir_exists("2024-2025/first/PROF001"));
    }

    #[tokio::test]
    async fn test_delete_department_leaves_nothing_under_prefixes() {
        let fx = Fixture::new().await;
        let ada = fx.professor("PROF001", "Ada").await;
        let bob = fx.professor("PROF002", "Bob").await;
        let cs101 = fx.course("CS101", "Intro").await;
        let cs102 = fx.course("CS102", "Data Structures").await;
        for (prof, course) in [(&ada, &cs101), (&bob, &cs102), (&ada, &cs102)] {
            fx.assign(prof, course).await;
            fx.provision_course(prof, course).await;
        }
        let ada_folders = fx.provision_course(&ada, &cs101).await;
        upload(&fx, &Fixture::principal(&ada), &ada_folders[1], &["a.pdf"]).await;

        // A professor from another department teaching one of the courses
        let physics = fx.department("Physics").await;
        let guest = fx.professor_in(physics, "PROF050", "Gus").await;
        fx.assign(&guest, &cs101).await;
        fx.provision_course(&guest, &cs101).await;
        let hod = fx.user("hod@uni.edu", Role::Hod, Some(fx.department_id)).await;

        let report = CascadeDeleter::new(fx.pool(), fx.storage())
            .delete_department(fx.department_id)
            .await
            .unwrap();

        assert_eq!(report.users_deleted, 3);
        assert_eq!(report.courses_deleted, 2);
        assert!(report.disk_errors.is_empty());

        let remaining: Vec<String> = FolderRepository::new(fx.pool())
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(remaining, vec!["2024-2025/first/PROF050"]);
        for prefix in ["2024-2025/first/PROF001", "2024-2025/first/PROF002"] {
            assert!(!fx.storage().dir_exists(prefix));
        }
        assert!(!fx.storage().dir_exists("2024-2025/first/PROF050/CS101 - Intro"));
        assert!(fx.storage().dir_exists("2024-2025/first/PROF050"));

        assert_eq!(count(&fx, "courses").await, 0);
        assert_eq!(count(&fx, "course_assignments").await, 0);
        assert_eq!(count(&fx, "uploaded_files").await, 0);
        assert!(UserRepository::new(fx.pool()).get_by_id(hod.id).await.unwrap().is_none());
        assert!(DepartmentRepository::new(fx.pool())
            .get_by_id(fx.department_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_disk_error_is_reported_not_fatal() {
        let fx = Fixture::new().await;
        let prof = fx.professor("PROF001", "Ada").await;
        let course = fx.course("CS101", "Intro").await;
        fx.assign(&prof, &course).await;
        let folders = fx.provision_course(&prof, &course).await;

        // Replace a subfolder directory with a regular file
        let exams = fx.storage().resolve(&folders[2].path).unwrap();
        std::fs::remove_dir(&exams).unwrap();
        std::fs::write(&exams, b"not a directory").unwrap();

        let report = CascadeDeleter::new(fx.pool(), fx.storage())
            .delete_user(prof.id)
            .await
            .unwrap();

        assert!(!report.disk_errors.is_empty());
        assert_eq!(report.folders_deleted, 6);
        assert_eq!(count(&fx, "folders").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_owner_is_not_found() {
        let fx = Fixture::new().await;
        let deleter = CascadeDeleter::new(fx.pool(), fx.storage());
        assert!(matches!(deleter.delete_user(9999).await, Err(ArchiveError::NotFound(_))));
        assert!(matches!(deleter.deletion_info(9999).await, Err(ArchiveError::NotFound(_))));
        assert!(matches!(
            deleter.delete_department(9999).await,
            Err(ArchiveError::NotFound(_))
        ));
    }
}
