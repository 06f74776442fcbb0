//! API handlers for the archive.

pub mod admin;
pub mod explorer;
pub mod file;

pub use admin::*;
pub use explorer::*;
pub use file::*;

use crate::file::{FileStorage, UploadLimits};
use crate::Database;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub storage: FileStorage,
    /// Upload limits used when a course has no requirement row.
    pub limits: UploadLimits,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, storage: FileStorage, limits: UploadLimits) -> Self {
        Self {
            db,
            storage,
            limits,
        }
    }
}
