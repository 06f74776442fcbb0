//! Role-filtered folder tree.
//!
//! The tree below a semester is assembled from folder rows and file rows on
//! each request. Every node carries the caller's read and write capability,
//! so a client can list a node and still show it read-only.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::access::{capability_for, folder_capability, Capability, Principal};
use super::folder::{Folder, FolderRepository, FolderType};
use super::metadata::{FileRepository, UploadedFile};
use super::path::{self, build_path, Breadcrumb};
use crate::academic::{AcademicYearRepository, SemesterRepository};
use crate::db::{DbPool, User, UserRepository};
use crate::{ArchiveError, Result};

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Year,
    Semester,
    Professor,
    Course,
    Subfolder,
    File,
}

impl From<FolderType> for NodeType {
    fn from(folder_type: FolderType) -> Self {
        match folder_type {
            FolderType::ProfessorRoot => NodeType::Professor,
            FolderType::Course => NodeType::Course,
            FolderType::Subfolder => NodeType::Subfolder,
        }
    }
}

/// A node as returned by the file explorer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Folder, file or semester id. `None` for unprovisioned nodes.
    pub entity_id: Option<i64>,
    /// `false` for a professor that has no folder yet.
    pub provisioned: bool,
    pub can_read: bool,
    pub can_write: bool,
    pub children: Vec<TreeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl TreeNode {
    fn folder(folder: &Folder, capability: Capability) -> Self {
        let metadata = folder
            .course_id
            .map(|course_id| json!({ "courseId": course_id }));
        Self {
            path: folder.path.clone(),
            name: folder.name.clone(),
            node_type: folder.folder_type.into(),
            entity_id: Some(folder.id),
            provisioned: true,
            can_read: capability.read,
            can_write: capability.write,
            children: Vec::new(),
            metadata,
        }
    }

    fn file(file: &UploadedFile, capability: Capability) -> Self {
        Self {
            path: file.file_url.clone(),
            name: file.original_filename.clone(),
            node_type: NodeType::File,
            entity_id: Some(file.id),
            provisioned: true,
            can_read: capability.read,
            can_write: capability.write,
            children: Vec::new(),
            metadata: Some(json!({
                "fileSize": file.file_size,
                "mimeType": file.mime_type,
                "uploaderId": file.uploader_id,
                "createdAt": file.created_at,
                "notes": file.notes,
            })),
        }
    }

    fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }
}

/// Folders before files, then case-insensitive by name.
pub fn sort_children(children: &mut [TreeNode]) {
    children.sort_by(|a, b| match (a.is_file(), b.is_file()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    });
}

/// Builds explorer nodes for a principal.
pub struct TreeBuilder<'a> {
    pool: &'a DbPool,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Semester node with one child per professor the principal can read.
    ///
    /// Professors without a root folder yet appear as unprovisioned nodes.
    pub async fn get_root_node(
        &self,
        academic_year_id: i64,
        semester_id: i64,
        principal: &Principal,
    ) -> Result<TreeNode> {
        let year = AcademicYearRepository::new(self.pool)
            .get_by_id(academic_year_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("academic year {academic_year_id}")))?;
        let semester = SemesterRepository::new(self.pool)
            .get_by_id(semester_id)
            .await?
            .filter(|s| s.academic_year_id == year.id)
            .ok_or_else(|| ArchiveError::NotFound(format!("semester {semester_id}")))?;

        let roots = FolderRepository::new(self.pool)
            .list_professor_roots(year.id, semester.id)
            .await?;

        let mut children = Vec::new();
        for professor in self.visible_professors(principal).await? {
            let Some(external_id) = professor.professor_id.as_deref() else {
                debug!(professor_id = professor.id, "Skipping professor without professor id");
                continue;
            };
            let root_path = build_path(&year.year_code, semester.semester_type, external_id, None, None);
            let capability = capability_for(principal, Some(professor.id), professor.department_id);
            let root = roots.iter().find(|f| f.path == root_path);

            children.push(TreeNode {
                path: root_path,
                name: professor.full_name(),
                node_type: NodeType::Professor,
                entity_id: root.map(|f| f.id),
                provisioned: root.is_some(),
                can_read: capability.read,
                can_write: capability.write && root.is_some(),
                children: Vec::new(),
                metadata: Some(json!({
                    "professorId": professor.id,
                    "externalId": external_id,
                })),
            });
        }
        sort_children(&mut children);

        Ok(TreeNode {
            path: path::join(&year.year_code, semester.semester_type.path_segment()),
            name: semester.semester_type.path_segment().to_string(),
            node_type: NodeType::Semester,
            entity_id: Some(semester.id),
            provisioned: true,
            can_read: true,
            can_write: principal.role.is_global(),
            children,
            metadata: Some(json!({
                "academicYearId": year.id,
                "yearCode": year.year_code,
            })),
        })
    }

    /// Folder at `path` with its readable children.
    ///
    /// Unknown paths are [`ArchiveError::NotFound`]; known paths the
    /// principal may not read are [`ArchiveError::Forbidden`].
    pub async fn get_node(&self, folder_path: &str, principal: &Principal) -> Result<TreeNode> {
        let folders = FolderRepository::new(self.pool);
        let folder = folders
            .get_by_path(folder_path)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("folder {}", path::normalize(folder_path))))?;

        let capability = folder_capability(self.pool, principal, &folder).await?;
        if !capability.read {
            return Err(ArchiveError::Forbidden(format!(
                "no read access to {}",
                folder.path
            )));
        }

        let mut node = TreeNode::folder(&folder, capability);

        for child in folders.list_children(&folder.path).await? {
            let child_capability = if child.owner_id == folder.owner_id {
                capability
            } else {
                folder_capability(self.pool, principal, &child).await?
            };
            if child_capability.read {
                node.children.push(TreeNode::folder(&child, child_capability));
            }
        }

        for file in FileRepository::new(self.pool).list_by_folder(folder.id).await? {
            node.children.push(TreeNode::file(&file, capability));
        }

        sort_children(&mut node.children);
        Ok(node)
    }

    /// Breadcrumb trail for a path. No access check.
    pub fn generate_breadcrumbs(folder_path: &str) -> Vec<Breadcrumb> {
        path::breadcrumbs(folder_path)
    }

    /// Active professors whose folders the principal may read.
    async fn visible_professors(&self, principal: &Principal) -> Result<Vec<User>> {
        let users = UserRepository::new(self.pool);
        let candidates = match (principal.role.is_global(), principal.department_id) {
            (true, _) => users.list_active_professors(None).await?,
            (false, Some(department_id)) => users.list_active_professors(Some(department_id)).await?,
            (false, None) => users
                .get_by_id(principal.user_id)
                .await?
                .filter(|u| u.is_professor() && u.is_active)
                .into_iter()
                .collect(),
        };

        Ok(candidates
            .into_iter()
            .filter(|p| capability_for(principal, Some(p.id), p.department_id).read)
            .collect())
    }
}
