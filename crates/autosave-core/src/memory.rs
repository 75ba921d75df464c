//! In-memory document host.
//!
//! Models an editor with plain documents and *aliases*: views that share
//! their base document's persisted resource. Saving a base document cleans
//! every alias of it. Killing a base document kills its aliases. Used by the
//! test suites and as a reference [`DocumentHost`] for embedders.

use crate::document::{ChangeKind, DocumentHost, DocumentId};
use crate::error::BoxError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct MemoryDocument {
    /// Document persisted on behalf of this one; `None` for plain documents.
    base: Option<DocumentId>,
    modified: bool,
    alive: bool,
    fail_saves: bool,
    saves: Vec<Instant>,
}

impl MemoryDocument {
    fn new(base: Option<DocumentId>) -> Self {
        Self {
            base,
            modified: false,
            alive: true,
            fail_saves: false,
            saves: Vec::new(),
        }
    }
}

/// Thread-safe in-memory [`DocumentHost`].
///
/// # Examples
///
/// ```
/// use autosave_core::{ChangeKind, MemoryHost};
///
/// let host = MemoryHost::new();
/// let doc = host.open();
///
/// assert_eq!(host.edit(doc), Some(ChangeKind::FirstModification));
/// assert_eq!(host.edit(doc), Some(ChangeKind::FurtherModification));
///
/// let view = host.open_alias(doc).unwrap();
/// assert_eq!(host.base_of(view), doc);
/// ```
#[derive(Debug, Default)]
pub struct MemoryHost {
    documents: DashMap<DocumentId, MemoryDocument>,
    next_id: AtomicU64,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new unmodified document.
    pub fn open(&self) -> DocumentId {
        self.insert(MemoryDocument::new(None))
    }

    /// Opens an alias of `base`. Aliases of aliases resolve to the root.
    ///
    /// Returns `None` if `base` is unknown or dead.
    pub fn open_alias(&self, base: DocumentId) -> Option<DocumentId> {
        if !self.is_alive(base) {
            return None;
        }
        let root = self.base_of(base);
        Some(self.insert(MemoryDocument::new(Some(root))))
    }

    /// Records an edit and classifies it from the document's own modified
    /// flag. Returns `None` for unknown or dead documents.
    pub fn edit(&self, document: DocumentId) -> Option<ChangeKind> {
        let (kind, base) = {
            let mut entry = self.documents.get_mut(&document)?;
            if !entry.alive {
                return None;
            }
            let kind = ChangeKind::from_was_modified(entry.modified);
            entry.modified = true;
            (kind, entry.base)
        };

        // Editing a view edits the shared resource
        if let Some(base) = base
            && let Some(mut base) = self.documents.get_mut(&base)
        {
            base.modified = true;
        }

        Some(kind)
    }

    /// Destroys `document` and, for a base document, every alias of it.
    ///
    /// Returns false if it was unknown or already dead.
    pub fn kill(&self, document: DocumentId) -> bool {
        let killed = match self.documents.get_mut(&document) {
            Some(mut entry) if entry.alive => {
                entry.alive = false;
                true
            }
            _ => false,
        };
        if killed {
            for mut entry in self.documents.iter_mut() {
                if entry.base == Some(document) {
                    entry.alive = false;
                }
            }
        }
        killed
    }

    /// Makes every following save of `document` fail (or succeed again).
    pub fn set_fail_saves(&self, document: DocumentId, fail: bool) {
        if let Some(mut entry) = self.documents.get_mut(&document) {
            entry.fail_saves = fail;
        }
    }

    /// The document actually persisted for `document`: its base for an alias,
    /// itself otherwise. Usable directly as a scheduler redirect function.
    pub fn base_of(&self, document: DocumentId) -> DocumentId {
        self.documents
            .get(&document)
            .and_then(|entry| entry.base)
            .unwrap_or(document)
    }

    pub fn save_count(&self, document: DocumentId) -> usize {
        self.documents
            .get(&document)
            .map_or(0, |entry| entry.saves.len())
    }

    /// Instants of every successful save of `document`, oldest first.
    pub fn save_times(&self, document: DocumentId) -> Vec<Instant> {
        self.documents
            .get(&document)
            .map(|entry| entry.saves.clone())
            .unwrap_or_default()
    }

    /// Total successful saves across all documents.
    pub fn total_saves(&self) -> usize {
        self.documents.iter().map(|entry| entry.saves.len()).sum()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn insert(&self, document: MemoryDocument) -> DocumentId {
        let id = DocumentId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.documents.insert(id, document);
        id
    }
}

#[async_trait]
impl DocumentHost for MemoryHost {
    fn is_alive(&self, document: DocumentId) -> bool {
        self.documents
            .get(&document)
            .is_some_and(|entry| entry.alive)
    }

    fn is_modified(&self, document: DocumentId) -> bool {
        self.documents
            .get(&document)
            .is_some_and(|entry| entry.modified)
    }

    async fn save(&self, document: DocumentId) -> Result<(), BoxError> {
        {
            let mut entry = self
                .documents
                .get_mut(&document)
                .ok_or_else(|| format!("unknown document {document}"))?;

            if !entry.alive {
                return Err(format!("{document} is closed").into());
            }
            if entry.fail_saves {
                return Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("{document} is read-only"),
                )));
            }

            entry.modified = false;
            entry.saves.push(Instant::now());
        }

        // The resource is clean now, and so is every view of it
        for mut entry in self.documents.iter_mut() {
            if entry.base == Some(document) {
                entry.modified = false;
            }
        }

        tracing::debug!("saved {}", document);
        Ok(())
    }
}
