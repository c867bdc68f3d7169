mod error;
mod file;
mod memory;
mod record;
mod traits;

pub mod conformance;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{Revision, StoredDocument};
pub use traits::DocumentStore;
