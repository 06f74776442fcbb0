//! Physical mirror of the folder tree.
//!
//! Every folder path maps to a directory under the storage base, and every
//! uploaded file lives at `<base>/<folder path>/<stored filename>`. All
//! disk errors surface as [`ArchiveError::Storage`].
//!
//! ```text
//! {base_path}/
//! └── 2024-2025/
//!     └── first/
//!         └── PROF007/
//!             └── CS101 - Intro/
//!                 ├── Syllabus/
//!                 │   └── syllabus.pdf
//!                 ├── Exams/
//!                 ├── Course Notes/
//!                 └── Assignments/
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use uuid::Uuid;

use super::path::SEPARATOR;
use crate::{ArchiveError, Result};

/// Disk side of the repository.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for the mirrored tree.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage rooted at `base_path`, creating it if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)
            .map_err(|e| ArchiveError::storage(base_path.display(), e))?;
        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a relative archive path to an absolute disk path.
    ///
    /// Rejects anything that could escape the base directory: `.`/`..`
    /// segments, absolute paths and drive prefixes.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let mut resolved = self.base_path.clone();
        for segment in relative.split(SEPARATOR).filter(|s| !s.is_empty()) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => resolved.push(part),
                _ => {
                    return Err(ArchiveError::Validation(format!(
                        "unsafe path segment in {relative:?}"
                    )))
                }
            }
        }
        Ok(resolved)
    }

    /// Whether a directory exists for the folder path.
    pub fn dir_exists(&self, folder_path: &str) -> bool {
        self.resolve(folder_path).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Create the directory for a folder path and any missing parents.
    ///
    /// Returns `true` when the leaf directory did not exist before this
    /// call. An already existing directory is not an error.
    pub fn ensure_dir(&self, folder_path: &str) -> Result<bool> {
        let dir = self.resolve(folder_path)?;
        let existed = dir.is_dir();
        fs::create_dir_all(&dir).map_err(|e| ArchiveError::storage(folder_path, e))?;
        Ok(!existed)
    }

    /// Remove an empty directory. Missing directories count as removed.
    pub fn remove_dir(&self, folder_path: &str) -> Result<bool> {
        let dir = self.resolve(folder_path)?;
        match fs::remove_dir(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ArchiveError::storage(folder_path, e)),
        }
    }

    /// Remove a directory and everything below it.
    pub fn remove_dir_all(&self, folder_path: &str) -> Result<bool> {
        let dir = self.resolve(folder_path)?;
        if dir == self.base_path {
            return Err(ArchiveError::Validation(
                "refusing to remove the storage root".to_string(),
            ));
        }
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ArchiveError::storage(folder_path, e)),
        }
    }

    /// Write `content` as `<folder_path>/<stored_name>`.
    ///
    /// Bytes go to a temporary sibling first and are renamed into place, so
    /// a reader never sees a half-written file.
    pub fn write(&self, folder_path: &str, stored_name: &str, content: &[u8]) -> Result<()> {
        let dir = self.resolve(folder_path)?;
        let target = self.resolve(&format!("{folder_path}/{stored_name}"))?;
        fs::create_dir_all(&dir).map_err(|e| ArchiveError::storage(folder_path, e))?;

        let temp = dir.join(format!(".{}.part", Uuid::new_v4()));
        let result = fs::write(&temp, content).and_then(|_| fs::rename(&temp, &target));
        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(ArchiveError::storage(format!("{folder_path}/{stored_name}"), e));
        }
        Ok(())
    }

    /// Read a stored file. A missing file is a storage failure.
    pub fn read(&self, file_path: &str) -> Result<Vec<u8>> {
        let path = self.resolve(file_path)?;
        fs::read(&path).map_err(|e| ArchiveError::storage(file_path, e))
    }

    /// Whether a stored file exists.
    pub fn file_exists(&self, file_path: &str) -> bool {
        self.resolve(file_path).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Delete a stored file.
    ///
    /// Returns `Ok(false)` if the file was already gone.
    pub fn delete(&self, file_path: &str) -> Result<bool> {
        let path = self.resolve(file_path)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ArchiveError::storage(file_path, e)),
        }
    }

    /// Time since a stored file was last modified.
    pub fn file_age(&self, file_path: &str) -> Result<Duration> {
        let path = self.resolve(file_path)?;
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|e| ArchiveError::storage(file_path, e))?;
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO))
    }

    /// Regular file names directly inside a folder directory.
    ///
    /// Temporary upload files are skipped. A missing directory yields an
    /// empty list.
    pub fn list_files(&self, folder_path: &str) -> Result<Vec<String>> {
        let dir = self.resolve(folder_path)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ArchiveError::storage(folder_path, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ArchiveError::storage(folder_path, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| ArchiveError::storage(folder_path, e))?
                .is_file();
            if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                if !name.ends_with(".part") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Pick a stored name for `original` inside `folder_path` that collides
    /// neither with a file on disk nor with a name in `reserved`.
    ///
    /// Duplicates become `name(1).ext`, `name(2).ext`, ...
    pub fn unique_name(
        &self,
        folder_path: &str,
        original: &str,
        reserved: &HashSet<String>,
    ) -> String {
        let safe = sanitize_filename(original);
        let (stem, ext) = split_extension(&safe);

        let mut candidate = safe.clone();
        let mut n = 1;
        while reserved.contains(&candidate)
            || self.file_exists(&format!("{folder_path}/{candidate}"))
        {
            candidate = match ext {
                Some(ext) => format!("{stem}({n}).{ext}"),
                None => format!("{stem}({n})"),
            };
            n += 1;
        }
        candidate
    }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`.
///
/// Leading dots are replaced too so a stored file is never hidden.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();
    let mut safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.starts_with('.') {
        safe.replace_range(0..1, "_");
    }
    if safe.is_empty() {
        safe.push_str("file");
    }
    safe
}

/// Lowercase extension of a filename, if any.
pub fn extract_extension(filename: &str) -> Option<String> {
    split_extension(filename).1.map(|e| e.to_lowercase())
}

fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => {
            (&filename[..idx], Some(&filename[idx + 1..]))
        }
        _ => (filename, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_storage() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_new_creates_base() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("uploads");
        let storage = FileStorage::new(&base).unwrap();
        assert!(base.is_dir());
        assert_eq!(storage.base_path(), base.as_path());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (storage, _temp) = setup_storage();

        assert!(storage.resolve("a/b/c").is_ok());
        assert!(storage.resolve("a/../b").is_err());
        assert!(storage.resolve("./a").is_err());
        assert!(storage
            .resolve("2024-2025/first/P/CS101 - Intro")
            .unwrap()
            .ends_with("CS101 - Intro"));
    }

    #[test]
    fn test_ensure_dir_reports_creation() {
        let (storage, _temp) = setup_storage();

        assert!(storage.ensure_dir("y/s/P").unwrap());
        assert!(!storage.ensure_dir("y/s/P").unwrap());
        assert!(storage.dir_exists("y/s/P"));
    }

    #[test]
    fn test_remove_dir_only_when_empty() {
        let (storage, _temp) = setup_storage();
        storage.ensure_dir("y/s/P/C").unwrap();

        assert!(storage.remove_dir("y/s/P").is_err());
        assert!(storage.remove_dir("y/s/P/C").unwrap());
        assert!(!storage.remove_dir("y/s/P/C").unwrap());
    }

    #[test]
    fn test_remove_dir_all_refuses_root() {
        let (storage, _temp) = setup_storage();
        assert!(storage.remove_dir_all("").is_err());
        storage.ensure_dir("a/b").unwrap();
        assert!(storage.remove_dir_all("a").unwrap());
        assert!(!storage.dir_exists("a"));
    }

    #[test]
    fn test_write_read_delete() {
        let (storage, _temp) = setup_storage();

        storage.write("y/s/P", "notes.pdf", b"%PDF-1.7").unwrap();
        assert!(storage.file_exists("y/s/P/notes.pdf"));
        assert_eq!(storage.read("y/s/P/notes.pdf").unwrap(), b"%PDF-1.7");
        assert_eq!(storage.list_files("y/s/P").unwrap(), vec!["notes.pdf"]);

        assert!(storage.delete("y/s/P/notes.pdf").unwrap());
        assert!(!storage.delete("y/s/P/notes.pdf").unwrap());
        assert!(matches!(
            storage.read("y/s/P/notes.pdf"),
            Err(ArchiveError::Storage(_))
        ));
    }

    #[test]
    fn test_list_files_missing_dir() {
        let (storage, _temp) = setup_storage();
        assert!(storage.list_files("nope").unwrap().is_empty());
    }

    #[test]
    fn test_unique_name() {
        let (storage, _temp) = setup_storage();
        storage.write("d", "report.pdf", b"1").unwrap();

        let mut reserved = HashSet::new();
        let first = storage.unique_name("d", "report.pdf", &reserved);
        assert_eq!(first, "report(1).pdf");

        reserved.insert(first);
        assert_eq!(
            storage.unique_name("d", "report.pdf", &reserved),
            "report(2).pdf"
        );
        assert_eq!(
            storage.unique_name("d", "fresh.docx", &reserved),
            "fresh.docx"
        );
        assert_eq!(storage.unique_name("d", "README", &reserved), "README");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Lecture 1 (draft).pdf"), "Lecture_1__draft_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\exam.docx"), "exam.docx");
        assert_eq!(sanitize_filename(".hidden"), "_hidden");
        assert_eq!(sanitize_filename("Über.pdf"), "_ber.pdf");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_extract_extension() {
        assert_eq!(extract_extension("a.PDF"), Some("pdf".to_string()));
        assert_eq!(extract_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extract_extension("noext"), None);
        assert_eq!(extract_extension(".bashrc"), None);
        assert_eq!(extract_extension("trailing."), None);
    }
}
