use std::fmt;

use sha2::{Digest, Sha256};

/// Content revision of a stored document: the hex SHA-256 of its text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    pub fn of(content: &str) -> Self {
        let hash = Sha256::digest(content.as_bytes());
        Revision(format!("{:x}", hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell revisions apart in messages.
        write!(f, "{}", &self.0[..12.min(self.0.len())])
    }
}

/// A document as read from a store, together with the revision to pass back
/// when replacing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub content: String,
    pub revision: Revision,
}

impl StoredDocument {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let revision = Revision::of(&content);
        StoredDocument { content, revision }
    }
}
