//! Change notification, timer fire and save handling.
//!
//! Bookkeeping runs with the scheduler's state lock held, so steps never
//! interleave with each other or with a timer callback. Saves are awaited
//! after the lock is released.

use super::Inner;
use super::state::SchedulerState;
use autosave_core::{BoxError, Diagnostic, DocumentId, TimerId};
use std::pin::Pin;
use std::sync::Arc;

type FireFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Result of persisting one target.
#[derive(Debug)]
pub(super) enum SaveOutcome {
    Saved,
    /// Target was dead; nothing was attempted.
    Dropped,
    Failed(BoxError),
}

impl Inner {
    /// Handles an unmodified -> modified transition of `doc`.
    pub(super) fn first_modification(self: &Arc<Self>, state: &mut SchedulerState, doc: DocumentId) {
        if !state.is_listening(doc) {
            tracing::trace!("ignoring first modification of inactive {}", doc);
            return;
        }

        let target = (self.redirect)(doc);
        if !self.host.is_alive(target) {
            self.sink.emit(Diagnostic::StaleTarget {
                stale: target,
                live: doc,
            });
            return;
        }

        if state.timers.is_pending(target) {
            tracing::debug!("{} joins the pending save of {}", doc, target);
            self.postpone(state, target);
        } else {
            tracing::debug!(
                "first modification of {}, saving {} in {:?}",
                doc,
                target,
                state.interval
            );
            self.arm(state, target);
        }

        state.forward(doc, target);
        state.check_invariants();
    }

    /// Handles a further edit of an already modified `doc`.
    pub(super) fn subsequent_modification(
        self: &Arc<Self>,
        state: &mut SchedulerState,
        doc: DocumentId,
    ) {
        let Some(target) = state.target_of(doc) else {
            // Still dirty after an episode ended without a successful save
            if state.is_listening(doc) && self.host.is_modified(doc) {
                tracing::debug!("{} modified outside an episode, re-arming", doc);
                self.first_modification(state, doc);
            } else {
                tracing::trace!("no forwarding listener on {}, ignoring edit", doc);
            }
            return;
        };

        if !self.host.is_alive(target) {
            self.sink.emit(Diagnostic::StaleTarget {
                stale: target,
                live: doc,
            });
            return;
        }

        self.postpone(state, target);
    }

    /// Timer callback. Drops stale fires, otherwise ends the episode and
    /// saves the target once the state lock is released.
    pub(super) async fn fire(&self, target: DocumentId, timer: TimerId) {
        let alive = {
            let mut state = self.state.lock().await;
            if !state.timers.complete(target, timer) {
                tracing::trace!("dropping stale timer {:?} for {}", timer, target);
                return;
            }
            self.close_episode(&mut state, target)
        };

        match self.persist(target, alive).await {
            SaveOutcome::Saved => tracing::debug!("auto-saved {}", target),
            SaveOutcome::Dropped => {}
            SaveOutcome::Failed(error) => self.report_save_failure(target, &error),
        }
    }

    /// Ends the pending-save episode of `target`. Returns whether the target
    /// is still alive and should be saved.
    ///
    /// Edits arriving while that save runs start a fresh episode.
    pub(super) fn close_episode(&self, state: &mut SchedulerState, target: DocumentId) -> bool {
        let alive = self.host.is_alive(target);
        if !alive {
            tracing::debug!("save target {} is gone, dropping pending save", target);
        }

        let swept = state.end_episode(target);
        tracing::trace!("episode of {} ended, detached {:?}", target, swept);
        state.check_invariants();
        alive
    }

    /// Saves a target whose episode was closed. Runs without the state lock.
    pub(super) async fn persist(&self, target: DocumentId, alive: bool) -> SaveOutcome {
        if !alive {
            return SaveOutcome::Dropped;
        }
        match self.host.save(target).await {
            Ok(()) => SaveOutcome::Saved,
            Err(error) => SaveOutcome::Failed(error),
        }
    }

    pub(super) fn report_save_failure(&self, target: DocumentId, error: &BoxError) {
        self.sink.emit(Diagnostic::SaveFailed {
            target,
            message: error.to_string(),
        });
    }

    fn arm(self: &Arc<Self>, state: &mut SchedulerState, target: DocumentId) {
        let interval = state.interval;
        let armed = state
            .timers
            .arm(target, interval, self.fire_callback());
        debug_assert!(armed.is_some(), "arm called with a pending timer on {target}");
    }

    fn postpone(self: &Arc<Self>, state: &mut SchedulerState, target: DocumentId) {
        let interval = state.interval;
        state.timers.postpone(target, interval, self.fire_callback());
        tracing::trace!("postponed save of {} by {:?}", target, interval);
    }

    /// Timer callbacks hold a weak handle so pending timers never keep a
    /// dropped scheduler alive.
    fn fire_callback(
        self: &Arc<Self>,
    ) -> impl FnOnce(DocumentId, TimerId) -> FireFuture + Send + 'static {
        let weak = Arc::downgrade(self);
        move |target: DocumentId, timer: TimerId| -> FireFuture {
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.fire(target, timer).await;
                }
            })
        }
    }
}
