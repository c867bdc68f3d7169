use crate::error::StorageError;
use crate::record::{Revision, StoredDocument};

/// Storage for a single pricing configuration document.
///
/// The configuration is read wholesale and rewritten wholesale. Writers follow
/// a read-modify-write cycle guarded by an optimistic revision check:
///
/// 1. `load()` returns the text and its [`Revision`]
/// 2. the caller derives the new text
/// 3. `replace(new_text, &revision)` succeeds only if the stored revision is
///    still the one that was read, otherwise it returns
///    `StorageError::ConcurrentConflict` and nothing is written
///
/// Implementations must be `Send + Sync` so one store can be shared between
/// threads.
pub trait DocumentStore: Send + Sync {
    /// Human-readable location used in errors and logs.
    fn location(&self) -> String;

    /// Read the current document.
    ///
    /// Returns `Err(StorageError::DocumentNotFound)` if nothing is stored.
    fn load(&self) -> Result<StoredDocument, StorageError>;

    /// Store the first version of the document.
    ///
    /// Returns `Err(StorageError::AlreadyExists)` if a document is present.
    fn create(&self, content: &str) -> Result<Revision, StorageError>;

    /// Replace the document if its revision still equals `expected`.
    fn replace(&self, content: &str, expected: &Revision) -> Result<Revision, StorageError>;
}
