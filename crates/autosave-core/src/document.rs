//! Document identity and the host editor seam.

use crate::error::BoxError;
use async_trait::async_trait;
use std::fmt;

/// Opaque handle to a document owned by the host editor.
///
/// Only identity matters to the scheduler; content, views and file paths
/// stay on the host side.
///
/// # Examples
///
/// ```
/// use autosave_core::DocumentId;
///
/// let doc = DocumentId::new(42);
/// assert_eq!(doc.get(), 42);
/// assert_eq!(doc.to_string(), "doc#42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for DocumentId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Class of a change notification delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The document went from unmodified to modified.
    FirstModification,
    /// The document was already modified and changed again.
    FurtherModification,
}

impl ChangeKind {
    /// Classifies an edit from the document's modified flag before the edit.
    pub const fn from_was_modified(was_modified: bool) -> Self {
        if was_modified {
            Self::FurtherModification
        } else {
            Self::FirstModification
        }
    }
}

/// Host editor services the scheduler consumes.
///
/// Implementations must be cheap to query: `is_alive` and `is_modified` are
/// called while the scheduler holds its state lock.
///
/// `save` runs without the lock and may call back into the scheduler. Edits
/// that arrive while it runs schedule a new save.
#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// Returns false once the document has been closed or destroyed.
    fn is_alive(&self, document: DocumentId) -> bool;

    /// Returns true if the document has unsaved changes.
    fn is_modified(&self, document: DocumentId) -> bool;

    /// Persists the document.
    async fn save(&self, document: DocumentId) -> Result<(), BoxError>;
}
