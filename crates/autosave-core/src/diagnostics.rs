//! Non-fatal diagnostics raised by the scheduler.
//!
//! Diagnostics go through a [`DiagnosticSink`] chosen at scheduler
//! construction. [`TracingSink`] is the default. [`RecordingSink`] keeps
//! them in memory for assertions.

use crate::document::DocumentId;
use std::fmt;
use std::sync::Mutex;

/// A condition the scheduler recovered from (or gave up on) without failing
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An edit on `live` was forwarded to `stale`, which no longer exists.
    /// The postpone was skipped.
    StaleTarget {
        stale: DocumentId,
        live: DocumentId,
    },
    /// The persistence primitive failed for `target`. The pending save was
    /// dropped and the episode ended anyway.
    SaveFailed { target: DocumentId, message: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleTarget { stale, live } => write!(
                f,
                "save target {stale} of {live} is no longer alive, skipping"
            ),
            Self::SaveFailed { target, message } => {
                write!(f, "auto-save of {target} failed: {message}")
            }
        }
    }
}

/// Receiver for scheduler diagnostics.
///
/// May be called while the scheduler holds its state lock, so
/// implementations must not block or call back into the scheduler.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::StaleTarget { .. } => tracing::warn!("{}", diagnostic),
            Diagnostic::SaveFailed { .. } => tracing::error!("{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory.
///
/// # Examples
///
/// ```
/// use autosave_core::{Diagnostic, DiagnosticSink, DocumentId, RecordingSink};
///
/// let sink = RecordingSink::new();
/// sink.emit(Diagnostic::StaleTarget {
///     stale: DocumentId::new(1),
///     live: DocumentId::new(2),
/// });
///
/// assert_eq!(sink.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingSink {
    recorded: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        // Pushes never leave the Vec half-written, so poisoning is ignored
        self.recorded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        tracing::debug!("recorded diagnostic: {}", diagnostic);
        self.lock().push(diagnostic);
    }
}
