//! Debounced auto-save for independently edited documents.
//!
//! Each watched document is saved a fixed quiescence interval after its
//! first unsaved change; every further change restarts the interval. Edits
//! on one document may be *redirected* to postpone the save of another, for
//! views that share one persisted resource.
//!
//! The host editor implements [`DocumentHost`] and pushes change
//! notifications into a [`DebounceScheduler`].

pub mod config;
pub mod scheduler;

// Re-export commonly used types
pub use autosave_core::{
    AutosaveError, BoxError, ChangeKind, Diagnostic, DiagnosticSink, DocumentHost, DocumentId,
    MemoryHost, RecordingSink, Result, TracingSink,
};
pub use config::AutosaveConfig;
pub use scheduler::{DebounceScheduler, DocumentStatus, Redirect, SchedulerBuilder};
