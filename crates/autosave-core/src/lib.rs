//! Core abstractions for autosave.
//!
//! This crate provides the building blocks the debounce scheduler is made of:
//!
//! - **Documents**: [`DocumentId`], [`ChangeKind`] and the [`DocumentHost`]
//!   trait the host editor implements (liveness, modified state, `save`)
//! - **Timers**: [`TimerRegistry`], at most one pending debounce timer per
//!   save target, with stale-fire detection via [`TimerId`]
//! - **Diagnostics**: the injectable [`DiagnosticSink`] for non-fatal
//!   conditions such as dead save targets
//! - **Error Types**: [`AutosaveError`] and the crate [`Result`] alias
//! - **MemoryHost**: an in-memory host with alias documents
//!
//! # Examples
//!
//! Implementing a host on top of an editor's buffer list:
//!
//! ```no_run
//! use autosave_core::{BoxError, DocumentHost, DocumentId};
//! use async_trait::async_trait;
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! struct Buffer {
//!     dirty: bool,
//!     text: String,
//! }
//!
//! struct Editor {
//!     buffers: RwLock<HashMap<DocumentId, Buffer>>,
//! }
//!
//! #[async_trait]
//! impl DocumentHost for Editor {
//!     fn is_alive(&self, document: DocumentId) -> bool {
//!         self.buffers.read().unwrap().contains_key(&document)
//!     }
//!
//!     fn is_modified(&self, document: DocumentId) -> bool {
//!         self.buffers
//!             .read()
//!             .unwrap()
//!             .get(&document)
//!             .is_some_and(|buffer| buffer.dirty)
//!     }
//!
//!     async fn save(&self, document: DocumentId) -> Result<(), BoxError> {
//!         let text = match self.buffers.read().unwrap().get(&document) {
//!             Some(buffer) => buffer.text.clone(),
//!             None => return Err("buffer closed".into()),
//!         };
//!         std::fs::write(format!("/tmp/{}.txt", document.get()), text)?;
//!         if let Some(buffer) = self.buffers.write().unwrap().get_mut(&document) {
//!             buffer.dirty = false;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

pub mod diagnostics;
pub mod document;
pub mod error;
pub mod memory;
pub mod timer;

// Re-export commonly used types
pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};
pub use document::{ChangeKind, DocumentHost, DocumentId};
pub use error::{AutosaveError, BoxError, Result};
pub use memory::MemoryHost;
pub use timer::{TimerId, TimerRegistry};
