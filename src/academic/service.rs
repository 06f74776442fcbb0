//! Course assignment use case.

use serde::Serialize;
use tracing::info;

use super::repository::{CourseAssignmentRepository, SemesterRepository};
use super::types::CourseAssignment;
use crate::db::DbPool;
use crate::file::{FileStorage, Folder, FolderProvisioner};
use crate::{ArchiveError, Result};

/// A course assignment with its provisioned folders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    pub assignment: CourseAssignment,
    /// Course folder first, then the standard subfolders.
    pub folders: Vec<Folder>,
}

pub struct AcademicService<'a> {
    pool: &'a DbPool,
    storage: &'a FileStorage,
}

impl<'a> AcademicService<'a> {
    pub fn new(pool: &'a DbPool, storage: &'a FileStorage) -> Self {
        Self { pool, storage }
    }

    /// Assign a professor to a course for a semester and provision the
    /// folder structure. Repeating the call returns the same assignment.
    ///
    /// Folders are provisioned before the assignment row is written, so an
    /// invalid professor or course leaves nothing behind.
    pub async fn assign_course(
        &self,
        professor_id: i64,
        course_id: i64,
        semester_id: i64,
    ) -> Result<AssignmentResult> {
        let semester = SemesterRepository::new(self.pool)
            .get_by_id(semester_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("semester {semester_id}")))?;

        let folders = FolderProvisioner::new(self.pool, self.storage)
            .create_course_folder_structure(
                professor_id,
                course_id,
                semester.academic_year_id,
                semester.id,
            )
            .await?;

        let assignment = CourseAssignmentRepository::new(self.pool)
            .create_or_get(semester.id, course_id, professor_id)
            .await?;

        info!(
            assignment_id = assignment.id,
            professor_id,
            course_id,
            semester_id,
            "Course assigned"
        );
        Ok(AssignmentResult {
            assignment,
            folders,
        })
    }
}
