//! Folder provisioning.
//!
//! Every provisioning call is idempotent. At most one row per path is
//! guaranteed by the unique index on `folders.path`: a caller that loses an
//! insert race gets a conflict, re-reads, and returns the winner's row. No
//! in-process locks are involved, so several service processes can share
//! one database and storage root.
//!
//! Each folder is written directory first. If the directory cannot be
//! created no row is inserted; if the insert fails for any reason other
//! than a lost race, a directory created by this call is removed again.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::folder::{Folder, FolderRepository, FolderType, NewFolder};
use super::path::{build_path, course_segment};
use super::storage::FileStorage;
use crate::academic::{
    AcademicYear, AcademicYearRepository, Course, CourseAssignmentRepository, CourseRepository,
    Semester, SemesterRepository,
};
use crate::db::{DbPool, Role, User, UserRepository};
use crate::submission::DocumentType;
use crate::{ArchiveError, Result};

/// Insert attempts per folder before a conflict is surfaced.
const MAX_ATTEMPTS: usize = 3;

/// Resolved ids for one professor in one academic year and semester.
struct Scope {
    professor: User,
    external_id: String,
    year: AcademicYear,
    semester: Semester,
}

impl Scope {
    fn root_path(&self) -> String {
        build_path(
            &self.year.year_code,
            self.semester.semester_type,
            &self.external_id,
            None,
            None,
        )
    }

    fn course_path(&self, course: &Course, subfolder: Option<&str>) -> String {
        let segment = course_segment(&course.course_code, &course.course_name);
        build_path(
            &self.year.year_code,
            self.semester.semester_type,
            &self.external_id,
            Some(&segment),
            subfolder,
        )
    }

    fn new_folder(&self, path: String, folder_type: FolderType) -> NewFolder {
        NewFolder::new(path, folder_type, self.year.id, self.semester.id).with_owner(self.professor.id)
    }
}

/// One failed assignment in a rebuild run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildFailure {
    pub assignment_id: i64,
    pub error: String,
}

/// Outcome of [`FolderProvisioner::rebuild_course_folders`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    pub assignments_processed: usize,
    pub succeeded: usize,
    /// Rows inserted by this run (pre-existing folders are not counted).
    pub folders_created: usize,
    pub failures: Vec<RebuildFailure>,
}

/// Creates professor and course folder structures.
pub struct FolderProvisioner<'a> {
    pool: &'a DbPool,
    storage: &'a FileStorage,
}

impl<'a> FolderProvisioner<'a> {
    pub fn new(pool: &'a DbPool, storage: &'a FileStorage) -> Self {
        Self { pool, storage }
    }

    /// Ensure the professor root for a year and semester exists.
    pub async fn create_professor_folder(
        &self,
        professor_id: i64,
        academic_year_id: i64,
        semester_id: i64,
    ) -> Result<Folder> {
        let scope = self.load_scope(professor_id, academic_year_id, semester_id).await?;
        let (root, _) = self
            .ensure_folder(scope.new_folder(scope.root_path(), FolderType::ProfessorRoot))
            .await?;
        Ok(root)
    }

    /// Ensure the professor root, the course folder and its four standard
    /// subfolders exist.
    ///
    /// Returns the course folder first, followed by the subfolders in
    /// [`DocumentType::ALL`] order.
    pub async fn create_course_folder_structure(
        &self,
        professor_id: i64,
        course_id: i64,
        academic_year_id: i64,
        semester_id: i64,
    ) -> Result<Vec<Folder>> {
        let (folders, _) = self
            .provision_course(professor_id, course_id, academic_year_id, semester_id)
            .await?;
        Ok(folders)
    }

    /// Whether the professor root exists. Read-only.
    pub async fn professor_folder_exists(
        &self,
        professor_id: i64,
        academic_year_id: i64,
        semester_id: i64,
    ) -> Result<bool> {
        let scope = self.load_scope(professor_id, academic_year_id, semester_id).await?;
        FolderRepository::new(self.pool)
            .exists_by_path(&scope.root_path())
            .await
    }

    /// Whether the course folder exists. Read-only.
    pub async fn course_folder_exists(
        &self,
        professor_id: i64,
        course_id: i64,
        academic_year_id: i64,
        semester_id: i64,
    ) -> Result<bool> {
        let scope = self.load_scope(professor_id, academic_year_id, semester_id).await?;
        let course = self.load_course(course_id).await?;
        FolderRepository::new(self.pool)
            .exists_by_path(&scope.course_path(&course, None))
            .await
    }

    /// Provision folders for every course assignment.
    ///
    /// A failing assignment is recorded in the report and the run goes on.
    pub async fn rebuild_course_folders(&self) -> Result<RebuildReport> {
        let assignments = CourseAssignmentRepository::new(self.pool).list_all().await?;
        let semesters = SemesterRepository::new(self.pool);
        let mut report = RebuildReport::default();

        info!(count = assignments.len(), "Rebuilding course folders");

        for assignment in assignments {
            report.assignments_processed += 1;

            let result = match semesters.get_by_id(assignment.semester_id).await {
                Ok(Some(semester)) => {
                    self.provision_course(
                        assignment.professor_id,
                        assignment.course_id,
                        semester.academic_year_id,
                        semester.id,
                    )
                    .await
                }
                Ok(None) => Err(ArchiveError::NotFound(format!(
                    "semester {}",
                    assignment.semester_id
                ))),
                Err(e) => Err(e),
            };

            match result {
                Ok((_, created)) => {
                    report.succeeded += 1;
                    report.folders_created += created;
                }
                Err(e) => {
                    warn!(assignment_id = assignment.id, error = %e, "Folder rebuild failed");
                    report.failures.push(RebuildFailure {
                        assignment_id: assignment.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = report.assignments_processed,
            succeeded = report.succeeded,
            created = report.folders_created,
            failed = report.failures.len(),
            "Course folder rebuild finished"
        );
        Ok(report)
    }

    /// Provision the course structure, returning the folders and how many
    /// rows this call inserted.
    async fn provision_course(
        &self,
        professor_id: i64,
        course_id: i64,
        academic_year_id: i64,
        semester_id: i64,
    ) -> Result<(Vec<Folder>, usize)> {
        let scope = self.load_scope(professor_id, academic_year_id, semester_id).await?;
        let course = self.load_course(course_id).await?;
        let mut created = 0;

        let (_, root_created) = self
            .ensure_folder(scope.new_folder(scope.root_path(), FolderType::ProfessorRoot))
            .await?;
        created += usize::from(root_created);

        let course_folder = scope
            .new_folder(scope.course_path(&course, None), FolderType::Course)
            .with_course(course.id);
        let (course_folder, course_created) = self.ensure_folder(course_folder).await?;
        created += usize::from(course_created);

        let mut folders = Vec::with_capacity(1 + DocumentType::ALL.len());
        folders.push(course_folder);

        for document_type in DocumentType::ALL {
            let path = scope.course_path(&course, Some(document_type.folder_name()));
            let (subfolder, sub_created) = self
                .ensure_folder(scope.new_folder(path, FolderType::Subfolder))
                .await?;
            created += usize::from(sub_created);
            folders.push(subfolder);
        }

        Ok((folders, created))
    }

    /// Return the folder at `new.path`, creating directory and row if absent.
    ///
    /// The flag is `true` when this call inserted the row.
    async fn ensure_folder(&self, new: NewFolder) -> Result<(Folder, bool)> {
        let repo = FolderRepository::new(self.pool);

        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(existing) = repo.get_by_path(&new.path).await? {
                return Ok((existing, false));
            }

            let dir_created = self.storage.ensure_dir(&new.path)?;

            match repo.create(&new).await {
                Ok(folder) => {
                    info!(
                        path = %folder.path,
                        folder_id = folder.id,
                        folder_type = %folder.folder_type,
                        "Created folder"
                    );
                    return Ok((folder, true));
                }
                Err(ArchiveError::Conflict(_)) => {
                    debug!(path = %new.path, attempt, "Folder created concurrently, re-reading");
                }
                Err(e) => {
                    if dir_created {
                        self.release_dir(&new.path).await;
                    }
                    return Err(e);
                }
            }
        }

        Err(ArchiveError::Conflict(format!(
            "folder {} could not be provisioned",
            new.path
        )))
    }

    /// Remove a directory this call created after its insert failed.
    ///
    /// Kept when a row for the path exists, since a concurrent caller may
    /// have committed it after creating the same directory.
    async fn release_dir(&self, folder_path: &str) {
        match FolderRepository::new(self.pool).exists_by_path(folder_path).await {
            Ok(false) => {
                if let Err(e) = self.storage.remove_dir(folder_path) {
                    warn!(path = %folder_path, error = %e, "Failed to remove directory after insert error");
                }
            }
            Ok(true) => {
                debug!(path = %folder_path, "Directory now backs a committed row, keeping it");
            }
            Err(e) => {
                warn!(path = %folder_path, error = %e, "Could not re-check folder row, keeping directory");
            }
        }
    }

    async fn load_scope(
        &self,
        professor_id: i64,
        academic_year_id: i64,
        semester_id: i64,
    ) -> Result<Scope> {
        let professor = UserRepository::new(self.pool)
            .get_by_id(professor_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("professor {professor_id}")))?;
        if professor.role != Role::Professor {
            return Err(ArchiveError::Validation(format!(
                "user {professor_id} is not a professor"
            )));
        }
        let external_id = match professor.professor_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(ArchiveError::Validation(format!(
                    "professor {professor_id} has no professor id"
                )))
            }
        };

        let year = AcademicYearRepository::new(self.pool)
            .get_by_id(academic_year_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("academic year {academic_year_id}")))?;
        let semester = SemesterRepository::new(self.pool)
            .get_by_id(semester_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("semester {semester_id}")))?;
        if semester.academic_year_id != year.id {
            return Err(ArchiveError::Validation(format!(
                "semester {semester_id} does not belong to academic year {academic_year_id}"
            )));
        }

        Ok(Scope {
            professor,
            external_id,
            year,
            semester,
        })
    }

    async fn load_course(&self, course_id: i64) -> Result<Course> {
        CourseRepository::new(self.pool)
            .get_by_id(course_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("course {course_id}")))
    }
}
