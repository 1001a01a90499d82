//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A file-based storage backend.
///
/// This backend keeps one document in one file. Data survives process
/// restarts.
///
/// # Durability
///
/// `replace()` writes the new document to a sibling temporary file, calls
/// `File::sync_all()` on it and renames it over the target. A crash leaves
/// either the old document or the new one on disk, never a torn mix.
///
/// # Thread Safety
///
/// `replace` takes `&mut self`, so writers are exclusive by construction;
/// callers sharing a backend wrap it in a lock. `read` never sees a
/// partial document because the rename is atomic.
///
/// # Example
///
/// ```no_run
/// use fleetdb_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("vehicles.json")).unwrap();
/// backend.replace(b"[]").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Opens a file backend for the document at `path`.
    ///
    /// The file itself is not created; a missing file reads as "no document"
    /// until the first `replace`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` names a directory or has no file name.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if path.file_name().is_none() {
            return Err(StorageError::InvalidLocation {
                path: path.to_path_buf(),
                reason: "path has no file name".into(),
            });
        }
        if path.is_dir() {
            return Err(StorageError::InvalidLocation {
                path: path.to_path_buf(),
                reason: "path is a directory".into(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Opens a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the path is invalid.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StorageBackend for FileBackend {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp = self.temp_path();

        let written = (|| -> io::Result<()> {
            let mut file: File = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp)?;
            file.write_all(data)?;
            file.flush()?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_missing_reads_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");

        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.read().unwrap().is_none());
        assert_eq!(backend.size().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn file_replace_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vehicles.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.replace(b"[1]").unwrap();
        backend.replace(b"[1,2]").unwrap();

        assert_eq!(backend.read().unwrap().unwrap(), b"[1,2]");
        assert_eq!(backend.size().unwrap(), 5);
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("insurance.json");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.replace(b"persistent data").unwrap();
        }

        {
            let backend = FileBackend::open(&path).unwrap();
            assert_eq!(backend.read().unwrap().unwrap(), b"persistent data");
        }
    }

    #[test]
    fn file_replace_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maintenance_data.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.replace(b"[]").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn file_backend_moves_across_threads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        let mut backend = FileBackend::open(&path).unwrap();

        let backend = std::thread::spawn(move || {
            backend.replace(b"{}").unwrap();
            backend
        })
        .join()
        .unwrap();
        assert_eq!(backend.read().unwrap().unwrap(), b"{}");
    }

    #[test]
    fn file_directory_rejected() {
        let dir = tempdir().unwrap();
        let result = FileBackend::open(dir.path());
        assert!(matches!(result, Err(StorageError::InvalidLocation { .. })));
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("path").join("users.json");

        let mut backend = FileBackend::open_with_create_dirs(&path).unwrap();
        backend.replace(b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn file_describe_is_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.path(), path);
        assert_eq!(backend.describe(), path.display().to_string());
    }
}
