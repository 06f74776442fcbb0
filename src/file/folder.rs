//! Folder model and repository.
//!
//! Folders are keyed by their canonical path. There is no parent pointer:
//! children are found by strict path prefix, and the unique index on
//! `path` is what keeps concurrent provisioning to one row per path.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sqlx::SqliteConnection;

use super::path::{self, SEPARATOR};
use crate::db::DbPool;
use crate::{ArchiveError, Result};

/// Level of a folder in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FolderType {
    /// A professor's space for one academic year and semester.
    ProfessorRoot,
    /// One course assignment under a professor root.
    Course,
    /// One of the fixed document categories under a course.
    Subfolder,
}

impl FolderType {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FolderType::ProfessorRoot => "PROFESSOR_ROOT",
            FolderType::Course => "COURSE",
            FolderType::Subfolder => "SUBFOLDER",
        }
    }
}

impl fmt::Display for FolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FolderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PROFESSOR_ROOT" => Ok(FolderType::ProfessorRoot),
            "COURSE" => Ok(FolderType::Course),
            "SUBFOLDER" => Ok(FolderType::Subfolder),
            _ => Err(format!("unknown folder type: {s}")),
        }
    }
}

impl TryFrom<String> for FolderType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// A folder row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: i64,
    /// Canonical path, unique and immutable.
    pub path: String,
    /// Display name (last path segment).
    pub name: String,
    #[sqlx(try_from = "String")]
    pub folder_type: FolderType,
    /// Owning professor. Always set by the provisioner.
    pub owner_id: Option<i64>,
    pub academic_year_id: i64,
    pub semester_id: i64,
    /// Set only on COURSE folders.
    pub course_id: Option<i64>,
    pub created_at: String,
}

impl Folder {
    /// Path depth (segment count).
    pub fn depth(&self) -> usize {
        path::depth(&self.path)
    }
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    pub path: String,
    pub folder_type: FolderType,
    pub owner_id: Option<i64>,
    pub academic_year_id: i64,
    pub semester_id: i64,
    pub course_id: Option<i64>,
}

impl NewFolder {
    /// Create a new folder definition for a canonical path.
    pub fn new(
        path: impl Into<String>,
        folder_type: FolderType,
        academic_year_id: i64,
        semester_id: i64,
    ) -> Self {
        Self {
            path: path.into(),
            folder_type,
            owner_id: None,
            academic_year_id,
            semester_id,
            course_id: None,
        }
    }

    /// Set the owning professor.
    pub fn with_owner(mut self, owner_id: i64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Set the course (COURSE folders only).
    pub fn with_course(mut self, course_id: i64) -> Self {
        self.course_id = Some(course_id);
        self
    }
}

const FOLDER_COLUMNS: &str = "id, path, name, folder_type, owner_id, academic_year_id,
                              semester_id, course_id, created_at";

/// `prefix/` used for strict-prefix matching. Avoids LIKE, since `_` is a
/// legal path character produced by sanitization.
fn child_prefix(parent: &str) -> String {
    format!("{}{}", path::normalize(parent), SEPARATOR)
}

/// Repository for folder rows.
pub struct FolderRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a folder.
    ///
    /// Returns [`ArchiveError::Conflict`] when the path already exists.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO folders (path, name, folder_type, owner_id, academic_year_id, semester_id, course_id)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&folder.path)
        .bind(path::last_segment(&folder.path))
        .bind(folder.folder_type.as_str())
        .bind(folder.owner_id)
        .bind(folder.academic_year_id)
        .bind(folder.semester_id)
        .bind(folder.course_id)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound("folder".to_string()))
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?");
        let folder = sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(folder)
    }

    /// Get a folder by exact path.
    pub async fn get_by_path(&self, folder_path: &str) -> Result<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE path = ?");
        let folder = sqlx::query_as::<_, Folder>(&sql)
            .bind(path::normalize(folder_path))
            .fetch_optional(self.pool)
            .await?;
        Ok(folder)
    }

    /// Whether a folder exists at the path.
    pub async fn exists_by_path(&self, folder_path: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM folders WHERE path = ?)")
            .bind(path::normalize(folder_path))
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    /// Direct children of a path (one level deeper), ordered by name.
    pub async fn list_children(&self, parent: &str) -> Result<Vec<Folder>> {
        let prefix = child_prefix(parent);
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE substr(path, 1, length(?)) = ?
               AND length(path) > length(?)
               AND instr(substr(path, length(?) + 1), '/') = 0
             ORDER BY name COLLATE NOCASE"
        );
        let folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(&prefix)
            .bind(&prefix)
            .bind(&prefix)
            .bind(&prefix)
            .fetch_all(self.pool)
            .await?;
        Ok(folders)
    }

    /// Every folder strictly below a path, deepest first.
    pub async fn list_descendants(&self, parent: &str) -> Result<Vec<Folder>> {
        let prefix = child_prefix(parent);
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE substr(path, 1, length(?)) = ? AND length(path) > length(?)"
        );
        let mut folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(&prefix)
            .bind(&prefix)
            .bind(&prefix)
            .fetch_all(self.pool)
            .await?;
        sort_deepest_first(&mut folders);
        Ok(folders)
    }

    /// Folders owned by a user, deepest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE owner_id = ?");
        let mut folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(owner_id)
            .fetch_all(self.pool)
            .await?;
        sort_deepest_first(&mut folders);
        Ok(folders)
    }

    /// COURSE folders of a course across all professors and semesters.
    pub async fn list_by_course(&self, course_id: i64) -> Result<Vec<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE course_id = ? ORDER BY path");
        let folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(course_id)
            .fetch_all(self.pool)
            .await?;
        Ok(folders)
    }

    /// Professor roots for one academic year and semester.
    pub async fn list_professor_roots(
        &self,
        academic_year_id: i64,
        semester_id: i64,
    ) -> Result<Vec<Folder>> {
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE folder_type = ? AND academic_year_id = ? AND semester_id = ?
             ORDER BY path"
        );
        let folders = sqlx::query_as::<_, Folder>(&sql)
            .bind(FolderType::ProfessorRoot.as_str())
            .bind(academic_year_id)
            .bind(semester_id)
            .fetch_all(self.pool)
            .await?;
        Ok(folders)
    }

    /// Every folder, shallowest first.
    pub async fn list_all(&self) -> Result<Vec<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders ORDER BY length(path), path");
        let folders = sqlx::query_as::<_, Folder>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(folders)
    }

    /// Delete a folder row inside a caller-owned transaction.
    ///
    /// Refuses to delete a folder that still has a descendant row, so the
    /// caller has to walk deepest paths first.
    pub async fn delete_in(conn: &mut SqliteConnection, folder: &Folder) -> Result<bool> {
        let prefix = child_prefix(&folder.path);
        let has_children: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM folders WHERE substr(path, 1, length(?)) = ?)",
        )
        .bind(&prefix)
        .bind(&prefix)
        .fetch_one(&mut *conn)
        .await?;
        if has_children {
            return Err(ArchiveError::Conflict(format!(
                "folder {} still has descendants",
                folder.path
            )));
        }

        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(folder.id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Order folders so that longer paths come before their ancestors.
pub fn sort_deepest_first(folders: &mut [Folder]) {
    folders.sort_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| a.path.cmp(&b.path)));
}
