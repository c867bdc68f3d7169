use std::path::PathBuf;

use crate::record::Revision;

/// All errors that can be returned by a `DocumentStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency conflict: the document changed since the caller
    /// read it. The caller must reload and reapply its change.
    #[error("concurrent conflict on {location}: expected revision {expected}, found {actual}")]
    ConcurrentConflict {
        location: String,
        expected: Revision,
        actual: Revision,
    },

    /// No document has been stored yet.
    #[error("document not found: {location}")]
    DocumentNotFound { location: String },

    /// `create` was called but a document is already present.
    #[error("document already exists: {location}")]
    AlreadyExists { location: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backend-specific storage error.
    #[error("storage backend error: {0}")]
    Backend(String),
}
