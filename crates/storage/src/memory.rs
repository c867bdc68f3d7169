use std::sync::Mutex;

use tracing::debug;

use crate::error::StorageError;
use crate::record::{Revision, StoredDocument};
use crate::traits::DocumentStore;

/// An in-process document store, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<Option<StoredDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `content`.
    pub fn with_content(content: impl Into<String>) -> Self {
        MemoryStore {
            doc: Mutex::new(Some(StoredDocument::new(content))),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<StoredDocument, StorageError> {
        let guard = self.doc.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or_else(|| StorageError::DocumentNotFound {
            location: self.location(),
        })
    }

    fn create(&self, content: &str) -> Result<Revision, StorageError> {
        let mut guard = self.doc.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return Err(StorageError::AlreadyExists {
                location: self.location(),
            });
        }
        let doc = StoredDocument::new(content);
        let revision = doc.revision.clone();
        *guard = Some(doc);
        Ok(revision)
    }

    fn replace(&self, content: &str, expected: &Revision) -> Result<Revision, StorageError> {
        let mut guard = self.doc.lock().unwrap_or_else(|e| e.into_inner());
        let current = guard.as_ref().ok_or_else(|| StorageError::DocumentNotFound {
            location: self.location(),
        })?;
        if &current.revision != expected {
            return Err(StorageError::ConcurrentConflict {
                location: self.location(),
                expected: expected.clone(),
                actual: current.revision.clone(),
            });
        }
        let doc = StoredDocument::new(content);
        let revision = doc.revision.clone();
        debug!(%revision, "document replaced in memory");
        *guard = Some(doc);
        Ok(revision)
    }
}
