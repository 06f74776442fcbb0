//! Folder and file repository.
//!
//! This module provides:
//! - Canonical, path-addressed folders mirrored as directories on disk
//! - Idempotent provisioning of professor and course folder structures
//! - Role-filtered tree and breadcrumb views
//! - Upload with replace-on-resubmit, and download
//! - Cascading deletion and storage reconciliation

mod access;
mod cascade;
mod folder;
mod metadata;
pub mod path;
mod provision;
mod reconcile;
mod storage;
mod tree;
mod upload;

pub use access::{capability, capability_for, folder_capability, Capability, Principal};
pub use cascade::{CascadeDeleter, DeletionInfo, DeletionReport};
pub use folder::{sort_deepest_first, Folder, FolderRepository, FolderType, NewFolder};
pub use metadata::{FileRepository, NewUploadedFile, UploadedFile};
pub use path::Breadcrumb;
pub use provision::{FolderProvisioner, RebuildFailure, RebuildReport};
pub use reconcile::{MissingFile, ReconcileReport, StorageReconciler, DEFAULT_ORPHAN_GRACE};
pub use storage::{extract_extension, sanitize_filename, FileStorage};
pub use tree::{sort_children, NodeType, TreeBuilder, TreeNode};
pub use upload::{
    resolve_mime_type, DownloadResult, FileUploadService, FolderRef, IncomingFile, UploadLimits,
    UploadRequest, DEFAULT_MIME_TYPE,
};
