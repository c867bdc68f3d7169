use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StorageError;
use crate::record::{Revision, StoredDocument};
use crate::traits::DocumentStore;

/// A document kept in one file on disk.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers never observe a half-written document. The
/// revision check and the rename happen under a lock held by this store;
/// writers in other processes are only caught if they changed the content
/// before the check.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_current(&self) -> Result<Option<StoredDocument>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(StoredDocument::new(content))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn write_atomic(&self, content: &str) -> Result<Revision, StorageError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_err(e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_err(e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        let revision = Revision::of(content);
        debug!(path = %self.path.display(), %revision, "document written");
        Ok(revision)
    }
}

impl DocumentStore for FileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<StoredDocument, StorageError> {
        self.read_current()?
            .ok_or_else(|| StorageError::DocumentNotFound {
                location: self.location(),
            })
    }

    fn create(&self, content: &str) -> Result<Revision, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.path.exists() {
            return Err(StorageError::AlreadyExists {
                location: self.location(),
            });
        }
        self.write_atomic(content)
    }

    fn replace(&self, content: &str, expected: &Revision) -> Result<Revision, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.load()?;
        if &current.revision != expected {
            return Err(StorageError::ConcurrentConflict {
                location: self.location(),
                expected: expected.clone(),
                actual: current.revision,
            });
        }
        self.write_atomic(content)
    }
}
