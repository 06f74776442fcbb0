//! Storage reconciliation.
//!
//! Brings the disk back in line with the metadata store after partial
//! failures: recreates directories for folder rows, reports file rows whose
//! bytes are gone, and removes untracked files inside tracked folders.
//! Rows are never changed. Running it twice in a row is a no-op.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::folder::FolderRepository;
use super::metadata::FileRepository;
use super::storage::FileStorage;
use crate::db::DbPool;
use crate::Result;

/// Untracked files younger than this may belong to an upload that has not
/// committed yet.
pub const DEFAULT_ORPHAN_GRACE: Duration = Duration::from_secs(15 * 60);

/// A file row whose bytes are missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingFile {
    pub file_id: i64,
    pub file_url: String,
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub folders_checked: usize,
    pub directories_created: Vec<String>,
    pub missing_files: Vec<MissingFile>,
    pub orphans_removed: Vec<String>,
    pub errors: Vec<String>,
}

/// Repairs the disk side of the repository.
pub struct StorageReconciler<'a> {
    pool: &'a DbPool,
    storage: &'a FileStorage,
    orphan_grace: Duration,
}

impl<'a> StorageReconciler<'a> {
    pub fn new(pool: &'a DbPool, storage: &'a FileStorage) -> Self {
        Self {
            pool,
            storage,
            orphan_grace: DEFAULT_ORPHAN_GRACE,
        }
    }

    /// Override the minimum age of an untracked file before removal.
    pub fn with_orphan_grace(mut self, grace: Duration) -> Self {
        self.orphan_grace = grace;
        self
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let folders = FolderRepository::new(self.pool).list_all().await?;
        let files = FileRepository::new(self.pool);
        let mut report = ReconcileReport::default();

        for folder in &folders {
            report.folders_checked += 1;

            if !self.storage.dir_exists(&folder.path) {
                match self.storage.ensure_dir(&folder.path) {
                    Ok(_) => report.directories_created.push(folder.path.clone()),
                    Err(e) => {
                        warn!(path = %folder.path, error = %e, "Failed to recreate directory");
                        report.errors.push(format!("{}: {e}", folder.path));
                        continue;
                    }
                }
            }

            let tracked: HashSet<String> = files
                .list_by_folder(folder.id)
                .await?
                .into_iter()
                .map(|f| f.stored_filename)
                .collect();

            let on_disk = match self.storage.list_files(&folder.path) {
                Ok(names) => names,
                Err(e) => {
                    report.errors.push(format!("{}: {e}", folder.path));
                    continue;
                }
            };

            for name in on_disk.into_iter().filter(|n| !tracked.contains(n)) {
                let file_path = format!("{}/{name}", folder.path);
                match self.storage.file_age(&file_path) {
                    Ok(age) if age < self.orphan_grace => continue,
                    Ok(_) => {}
                    Err(e) => {
                        report.errors.push(format!("{file_path}: {e}"));
                        continue;
                    }
                }
                match self.storage.delete(&file_path) {
                    Ok(_) => report.orphans_removed.push(file_path),
                    Err(e) => {
                        warn!(path = %file_path, error = %e, "Failed to remove untracked file");
                        report.errors.push(format!("{file_path}: {e}"));
                    }
                }
            }
        }

        for file in files.list_all().await? {
            if !self.storage.file_exists(&file.file_url) {
                report.missing_files.push(MissingFile {
                    file_id: file.id,
                    file_url: file.file_url,
                });
            }
        }

        info!(
            folders = report.folders_checked,
            created = report.directories_created.len(),
            missing = report.missing_files.len(),
            orphans = report.orphans_removed.len(),
            errors = report.errors.len(),
            "Storage reconciliation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::file::upload::{FileUploadService, FolderRef, IncomingFile, UploadLimits, UploadRequest};
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_reconcile_repairs_disk() {
        let fx = Fixture::new().await;
        let prof = fx.professor("PROF001", "Ada").await;
        let course = fx.course("CS101", "Intro").await;
        fx.assign(&prof, &course).await;
        let folders = fx.provision_course(&prof, &course).await;

        let limits = UploadLimits::from_config(&StorageConfig::default());
        let uploaded = FileUploadService::new(fx.pool(), fx.storage(), &limits)
            .upload_files(
                &UploadRequest::new(
                    FolderRef::Id(folders[1].id),
                    vec![
                        IncomingFile::new("keep.pdf", b"keep".to_vec()),
                        IncomingFile::new("lost.pdf", b"lost".to_vec()),
                    ],
                ),
                &Fixture::principal(&prof),
            )
            .await
            .unwrap();

        fx.storage().delete(&uploaded[1].file_url).unwrap();
        fx.storage().write(&folders[1].path, "stray.pdf", b"stray").unwrap();
        fx.storage().remove_dir(&folders[4].path).unwrap();

        let reconciler = StorageReconciler::new(fx.pool(), fx.storage()).with_orphan_grace(Duration::ZERO);
        let report = reconciler.reconcile().await.unwrap();

        assert_eq!(report.folders_checked, 6);
        assert_eq!(report.directories_created, vec![folders[4].path.clone()]);
        assert_eq!(
            report.missing_files,
            vec![MissingFile {
                file_id: uploaded[1].id,
                file_url: uploaded[1].file_url.clone(),
            }]
        );
        assert_eq!(report.orphans_removed, vec![format!("{}/stray.pdf", folders[1].path)]);
        assert!(report.errors.is_empty());
        assert!(fx.storage().file_exists(&uploaded[0].file_url));

        let again = reconciler.reconcile().await.unwrap();
        assert!(again.directories_created.is_empty());
        assert!(again.orphans_removed.is_empty());
        assert_eq!(again.missing_files.len(), 1);
    }

    #[tokio::test]
    async fn test_recent_untracked_files_are_kept() {
        let fx = Fixture::new().await;
        let prof = fx.professor("PROF001", "Ada").await;
        let root = fx
            .provisioner()
            .create_professor_folder(prof.id, fx.year.id, fx.semester.id)
            .await
            .unwrap();
        fx.storage().write(&root.path, "fresh.pdf", b"x").unwrap();

        let report = StorageReconciler::new(fx.pool(), fx.storage())
            .reconcile()
            .await
            .unwrap();

        assert!(report.orphans_removed.is_empty());
        assert!(fx.storage().file_exists(&format!("{}/fresh.pdf", root.path)));
    }
}
