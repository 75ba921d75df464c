//! Per-target debounce timers.
//!
//! Each timer is a tokio task that sleeps for the quiescence interval and
//! then runs its callback. Cancelling aborts the task. Every armed timer gets
//! a fresh [`TimerId`], so a callback that was already queued when its timer
//! got replaced can recognise itself as stale.

use crate::document::DocumentId;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Stand-in deadline for intervals that overflow `Instant` (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Identity of one armed timer.
///
/// Ids are never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct TimerHandle {
    id: TimerId,
    deadline: Instant,
    task: JoinHandle<()>,
}

/// Registry of pending debounce timers, at most one per target.
///
/// Not internally synchronized: the owner serializes access, which is what
/// makes [`postpone`](Self::postpone) a single step relative to fire
/// callbacks.
///
/// Must be used from within a tokio runtime.
///
/// # Examples
///
/// ```
/// use autosave_core::{DocumentId, TimerRegistry};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut timers = TimerRegistry::new();
/// let doc = DocumentId::new(1);
///
/// let first = timers.arm(doc, Duration::from_secs(5), |_, _| async {});
/// assert!(first.is_some());
///
/// // Arming again is a no-op while a timer is pending
/// assert!(timers.arm(doc, Duration::from_secs(5), |_, _| async {}).is_none());
///
/// assert!(timers.cancel(doc));
/// assert!(!timers.is_pending(doc));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: HashMap<DocumentId, TimerHandle>,
    next_id: u64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer for `target` unless one is already pending.
    ///
    /// After `interval` elapses with no intervening cancel or postpone,
    /// `on_fire(target, id)` runs exactly once on the runtime. Returns the id
    /// of the new timer, or `None` if `target` already had one.
    pub fn arm<F, Fut>(
        &mut self,
        target: DocumentId,
        interval: Duration,
        on_fire: F,
    ) -> Option<TimerId>
    where
        F: FnOnce(DocumentId, TimerId) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.timers.contains_key(&target) {
            return None;
        }
        Some(self.spawn(target, interval, on_fire))
    }

    /// Cancels the pending timer for `target`.
    ///
    /// Returns true if a timer was cancelled. Safe to call when none exists.
    pub fn cancel(&mut self, target: DocumentId) -> bool {
        match self.timers.remove(&target) {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels any pending timer for `target` and arms a fresh one, restarting
    /// the full interval.
    pub fn postpone<F, Fut>(
        &mut self,
        target: DocumentId,
        interval: Duration,
        on_fire: F,
    ) -> TimerId
    where
        F: FnOnce(DocumentId, TimerId) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel(target);
        self.spawn(target, interval, on_fire)
    }

    /// Returns true if `id` is the live timer for `target`.
    pub fn is_current(&self, target: DocumentId, id: TimerId) -> bool {
        self.timers.get(&target).is_some_and(|timer| timer.id == id)
    }

    /// Removes the entry for a timer whose callback is running.
    ///
    /// Unlike [`cancel`](Self::cancel) this does not abort the task, since the
    /// caller usually *is* that task. Returns false, and leaves the registry
    /// untouched, if `id` is not the live timer for `target`.
    pub fn complete(&mut self, target: DocumentId, id: TimerId) -> bool {
        if !self.is_current(target, id) {
            return false;
        }
        self.timers.remove(&target);
        true
    }

    /// Id of the pending timer for `target`.
    pub fn current(&self, target: DocumentId) -> Option<TimerId> {
        self.timers.get(&target).map(|timer| timer.id)
    }

    pub fn is_pending(&self, target: DocumentId) -> bool {
        self.timers.contains_key(&target)
    }

    /// When the pending timer for `target` is due to fire.
    pub fn deadline(&self, target: DocumentId) -> Option<Instant> {
        self.timers.get(&target).map(|timer| timer.deadline)
    }

    /// Targets with a pending timer, in ascending id order.
    pub fn targets(&self) -> Vec<DocumentId> {
        let mut targets: Vec<DocumentId> = self.timers.keys().copied().collect();
        targets.sort_unstable();
        targets
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Cancels every pending timer. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        for (_, timer) in self.timers.drain() {
            timer.task.abort();
        }
        count
    }

    fn spawn<F, Fut>(&mut self, target: DocumentId, interval: Duration, on_fire: F) -> TimerId
    where
        F: FnOnce(DocumentId, TimerId) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let now = Instant::now();
        let deadline = now
            .checked_add(interval)
            .unwrap_or_else(|| now + FAR_FUTURE);

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            on_fire(target, id).await;
        });

        let previous = self.timers.insert(target, TimerHandle { id, deadline, task });
        debug_assert!(
            previous.is_none(),
            "two live timers registered for {target}"
        );

        tracing::trace!("armed timer {:?} for {} ({:?})", id, target, interval);
        id
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
