//! Debounced save scheduling.
//!
//! This module provides the per-document state machine:
//! - `state`: per-document bookkeeping and the target -> sources sets
//! - `lifecycle`: change notification, timer fire and save handling
//!
//! A document goes `Idle -> Pending` on its first unsaved edit, when a
//! timer is armed on its save *target*. Further edits postpone that timer.
//! When it fires the target is saved and every document forwarding to it
//! returns to `Idle`.

mod lifecycle;
mod state;

use crate::config::{AutosaveConfig, clamp_interval};
use autosave_core::{
    AutosaveError, ChangeKind, DiagnosticSink, DocumentHost, DocumentId, Result, TracingSink,
};
use lifecycle::SaveOutcome;
use state::SchedulerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Maps an edited document to the document that is actually saved.
pub type Redirect = Arc<dyn Fn(DocumentId) -> DocumentId + Send + Sync>;

/// Save status of a document as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    /// No save pending on behalf of this document.
    Idle,
    /// A save of `target` is pending, either driven by this document's edits
    /// or because this document is itself the target.
    Pending { target: DocumentId },
}

/// Builder for [`DebounceScheduler`].
///
/// # Examples
///
/// ```
/// use autosave::{AutosaveConfig, MemoryHost, RecordingSink, SchedulerBuilder};
/// use std::sync::Arc;
///
/// let host = Arc::new(MemoryHost::new());
/// let aliases = Arc::clone(&host);
///
/// let scheduler = SchedulerBuilder::new(host)
///     .config(AutosaveConfig::default())
///     .redirect(move |doc| aliases.base_of(doc))
///     .diagnostics(Arc::new(RecordingSink::new()))
///     .build();
/// # drop(scheduler);
/// ```
pub struct SchedulerBuilder {
    host: Arc<dyn DocumentHost>,
    config: AutosaveConfig,
    redirect: Option<Redirect>,
    sink: Arc<dyn DiagnosticSink>,
}

impl SchedulerBuilder {
    pub fn new(host: Arc<dyn DocumentHost>) -> Self {
        Self {
            host,
            config: AutosaveConfig::default(),
            redirect: None,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn config(mut self, config: AutosaveConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the save-target redirection. Defaults to identity.
    pub fn redirect<F>(mut self, redirect: F) -> Self
    where
        F: Fn(DocumentId) -> DocumentId + Send + Sync + 'static,
    {
        self.redirect = Some(Arc::new(redirect));
        self
    }

    /// Sets the receiver of non-fatal diagnostics. Defaults to [`TracingSink`].
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> DebounceScheduler {
        let redirect = self
            .redirect
            .unwrap_or_else(|| Arc::new(|doc: DocumentId| doc));
        DebounceScheduler {
            inner: Arc::new(Inner {
                host: self.host,
                redirect,
                sink: self.sink,
                enabled: self.config.enabled,
                state: Mutex::new(SchedulerState::new(self.config.interval())),
            }),
        }
    }
}

/// Debounced auto-save scheduler.
///
/// Cheap to clone; clones share state. All operations are serialized on one
/// lock. Saves run after it is released, so a slow save never delays other
/// documents. Requires a tokio runtime with the time driver enabled.
///
/// # Examples
///
/// ```
/// use autosave::{AutosaveConfig, DocumentStatus, MemoryHost, SchedulerBuilder};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let host = Arc::new(MemoryHost::new());
/// let scheduler = SchedulerBuilder::new(host.clone()).build();
///
/// let doc = host.open();
/// scheduler.activate(doc).await.unwrap();
///
/// let kind = host.edit(doc).unwrap();
/// scheduler.notify(doc, kind).await;
/// assert_eq!(scheduler.status(doc).await, DocumentStatus::Pending { target: doc });
///
/// tokio::time::sleep(std::time::Duration::from_secs(6)).await;
/// assert_eq!(host.save_count(doc), 1);
/// assert_eq!(scheduler.status(doc).await, DocumentStatus::Idle);
/// # }
/// ```
#[derive(Clone)]
pub struct DebounceScheduler {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    host: Arc<dyn DocumentHost>,
    redirect: Redirect,
    sink: Arc<dyn DiagnosticSink>,
    enabled: bool,
    state: Mutex<SchedulerState>,
}

impl std::fmt::Debug for DebounceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("DebounceScheduler");
        debug.field("enabled", &self.inner.enabled);
        match self.inner.state.try_lock() {
            Ok(state) => debug
                .field("interval", &state.interval)
                .field("tracked", &state.tracked_count())
                .field("pending", &state.timers.len()),
            Err(_) => debug.field("state", &"<locked>"),
        };
        debug.finish()
    }
}

impl DebounceScheduler {
    /// Shorthand for `SchedulerBuilder::new(host).build()`.
    pub fn new(host: Arc<dyn DocumentHost>) -> Self {
        SchedulerBuilder::new(host).build()
    }

    pub fn builder(host: Arc<dyn DocumentHost>) -> SchedulerBuilder {
        SchedulerBuilder::new(host)
    }

    /// Turns auto-save on for `doc`.
    ///
    /// If `doc` already has unsaved changes, its save is scheduled right away
    /// as if it had just been modified. Activating an active document does
    /// nothing. Does nothing either when auto-save is disabled in the config.
    pub async fn activate(&self, doc: DocumentId) -> Result<()> {
        if !self.inner.host.is_alive(doc) {
            return Err(AutosaveError::DocumentNotAlive(doc));
        }
        if !self.inner.enabled {
            tracing::debug!("auto-save disabled, not activating {}", doc);
            return Ok(());
        }

        let mut state = self.inner.state.lock().await;
        if !state.attach_listener(doc) {
            return Ok(());
        }
        tracing::debug!("auto-save activated for {}", doc);

        if self.inner.host.is_modified(doc) {
            self.inner.first_modification(&mut state, doc);
        }
        Ok(())
    }

    /// Turns auto-save off for `doc`. Idempotent.
    ///
    /// Cancels the pending save of `doc` itself if it is a save target, and
    /// detaches every document forwarding to it. A save of another target
    /// that `doc` was forwarding to stays pending.
    pub async fn deactivate(&self, doc: DocumentId) {
        let mut state = self.inner.state.lock().await;
        if state.remove_document(doc) {
            tracing::debug!("auto-save deactivated for {}", doc);
        }
        state.check_invariants();
    }

    /// Forgets a document the host has destroyed.
    pub async fn document_killed(&self, doc: DocumentId) {
        let mut state = self.inner.state.lock().await;
        if state.remove_document(doc) {
            tracing::debug!("{} was killed, dropped its auto-save state", doc);
        }
        state.check_invariants();
    }

    /// Delivers a change notification from the host.
    pub async fn notify(&self, doc: DocumentId, kind: ChangeKind) {
        match kind {
            ChangeKind::FirstModification => self.first_modification(doc).await,
            ChangeKind::FurtherModification => self.subsequent_modification(doc).await,
        }
    }

    /// `doc` went from unmodified to modified.
    pub async fn first_modification(&self, doc: DocumentId) {
        let mut state = self.inner.state.lock().await;
        self.inner.first_modification(&mut state, doc);
    }

    /// `doc` was modified again.
    pub async fn subsequent_modification(&self, doc: DocumentId) {
        let mut state = self.inner.state.lock().await;
        self.inner.subsequent_modification(&mut state, doc);
    }

    /// Saves the pending target of `doc` immediately.
    ///
    /// Returns `Ok(false)` if no save was pending or the target is gone.
    /// The episode ends even if the save fails.
    pub async fn flush(&self, doc: DocumentId) -> Result<bool> {
        let (target, alive) = {
            let mut state = self.inner.state.lock().await;
            let target = state.target_of(doc).unwrap_or(doc);
            if !state.timers.cancel(target) {
                return Ok(false);
            }
            (target, self.inner.close_episode(&mut state, target))
        };

        match self.inner.persist(target, alive).await {
            SaveOutcome::Saved => Ok(true),
            SaveOutcome::Dropped => Ok(false),
            SaveOutcome::Failed(source) => Err(AutosaveError::SaveFailed {
                document: target,
                source,
            }),
        }
    }

    /// Saves every pending target immediately, e.g. before the host exits.
    ///
    /// Failures are reported to the diagnostic sink. Returns the number of
    /// targets saved.
    pub async fn flush_all(&self) -> usize {
        let claimed: Vec<(DocumentId, bool)> = {
            let mut state = self.inner.state.lock().await;
            let mut claimed = Vec::new();
            for target in state.timers.targets() {
                state.timers.cancel(target);
                claimed.push((target, self.inner.close_episode(&mut state, target)));
            }
            claimed
        };

        let mut saved = 0;
        for (target, alive) in claimed {
            match self.inner.persist(target, alive).await {
                SaveOutcome::Saved => saved += 1,
                SaveOutcome::Dropped => {}
                SaveOutcome::Failed(error) => self.inner.report_save_failure(target, &error),
            }
        }

        tracing::debug!("flushed {} pending saves", saved);
        saved
    }

    /// Cancels every pending save and forgets every document.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        let dropped = state.clear();
        tracing::debug!("auto-save shut down, {} pending saves dropped", dropped);
    }

    /// Changes the quiescence interval. Timers already armed keep theirs.
    ///
    /// Intervals above one day are clamped, as in [`AutosaveConfig`].
    pub async fn set_interval(&self, interval: Duration) {
        self.inner.state.lock().await.interval = clamp_interval(interval);
    }

    pub async fn interval(&self) -> Duration {
        self.inner.state.lock().await.interval
    }

    /// Returns true if auto-save is on for `doc`.
    pub async fn is_active(&self, doc: DocumentId) -> bool {
        self.inner.state.lock().await.is_listening(doc)
    }

    /// Returns true if a save of `target` is pending.
    pub async fn is_pending(&self, target: DocumentId) -> bool {
        self.inner.state.lock().await.timers.is_pending(target)
    }

    pub async fn status(&self, doc: DocumentId) -> DocumentStatus {
        let state = self.inner.state.lock().await;
        match state.target_of(doc) {
            Some(target) if state.timers.is_pending(target) => DocumentStatus::Pending { target },
            _ if state.timers.is_pending(doc) => DocumentStatus::Pending { target: doc },
            _ => DocumentStatus::Idle,
        }
    }

    /// Save target `doc`'s edits currently forward to.
    pub async fn target_of(&self, doc: DocumentId) -> Option<DocumentId> {
        self.inner.state.lock().await.target_of(doc)
    }

    /// Documents whose edits currently forward to `target`.
    pub async fn sources_of(&self, target: DocumentId) -> Vec<DocumentId> {
        self.inner.state.lock().await.sources_of(target)
    }

    /// Targets with a pending save, in ascending id order.
    pub async fn pending_targets(&self) -> Vec<DocumentId> {
        self.inner.state.lock().await.timers.targets()
    }

    /// When the pending save of `target` is due.
    pub async fn deadline(&self, target: DocumentId) -> Option<Instant> {
        self.inner.state.lock().await.timers.deadline(target)
    }

    /// Number of documents with scheduler state.
    pub async fn tracked_count(&self) -> usize {
        self.inner.state.lock().await.tracked_count()
    }
}
