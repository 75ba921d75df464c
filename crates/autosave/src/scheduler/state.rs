use autosave_core::{DocumentId, TimerRegistry};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Per-document scheduler state.
///
/// A document gets one when the scheduler is activated on it, or lazily when
/// another document's edits are redirected to it. The pending timer of a
/// target lives in the [`TimerRegistry`] entry keyed by that target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct DebounceState {
    /// First-modification listener attached (mode enabled)
    pub listening: bool,
    /// Save target of the current episode; `Some` while the forwarding
    /// listener is attached
    pub target: Option<DocumentId>,
}

impl DebounceState {
    fn is_idle(&self) -> bool {
        !self.listening && self.target.is_none()
    }
}

/// Everything the scheduler mutates, guarded by one lock.
#[derive(Debug)]
pub(crate) struct SchedulerState {
    documents: HashMap<DocumentId, DebounceState>,
    /// target -> documents whose forwarding listener points at it
    sources: HashMap<DocumentId, HashSet<DocumentId>>,
    pub timers: TimerRegistry,
    pub interval: Duration,
}

impl SchedulerState {
    pub fn new(interval: Duration) -> Self {
        Self {
            documents: HashMap::new(),
            sources: HashMap::new(),
            timers: TimerRegistry::new(),
            interval,
        }
    }

    pub fn is_listening(&self, doc: DocumentId) -> bool {
        self.documents.get(&doc).is_some_and(|state| state.listening)
    }

    /// Attaches the first-modification listener. Returns false if it was
    /// already attached.
    pub fn attach_listener(&mut self, doc: DocumentId) -> bool {
        let state = self.documents.entry(doc).or_default();
        !std::mem::replace(&mut state.listening, true)
    }

    pub fn target_of(&self, doc: DocumentId) -> Option<DocumentId> {
        self.documents.get(&doc).and_then(|state| state.target)
    }

    /// Points `source`'s forwarding listener at `target`, leaving whatever
    /// target it pointed at before.
    ///
    /// A previous target left without sources, and not listening itself,
    /// loses its pending save.
    pub fn forward(&mut self, source: DocumentId, target: DocumentId) {
        let previous = self.documents.entry(source).or_default().target.replace(target);
        if let Some(previous) = previous
            && previous != target
        {
            self.leave(source, previous);
            if !self.sources.contains_key(&previous)
                && !self.is_listening(previous)
                && self.timers.cancel(previous)
            {
                tracing::debug!("{} lost its last source, pending save cancelled", previous);
            }
            self.prune(previous);
        }

        self.documents.entry(target).or_default();
        self.sources.entry(target).or_default().insert(source);
    }

    /// Ends the pending-save episode of `target`.
    ///
    /// Cancels its timer if still armed and detaches the forwarding listener
    /// of every source pointing at it. Returns the detached sources.
    pub fn end_episode(&mut self, target: DocumentId) -> Vec<DocumentId> {
        self.timers.cancel(target);

        let mut swept: Vec<DocumentId> = self
            .sources
            .remove(&target)
            .unwrap_or_default()
            .into_iter()
            .collect();
        swept.sort_unstable();

        for &source in &swept {
            if let Some(state) = self.documents.get_mut(&source) {
                state.target = None;
            }
            self.prune(source);
        }
        self.prune(target);
        swept
    }

    /// Drops every trace of `doc`: its listeners, its membership in a
    /// target's source set, its own pending timer, and the forwarding
    /// listeners of sources still pointing at it.
    ///
    /// A pending timer of some *other* target is left alone. Returns false
    /// if there was nothing to drop.
    pub fn remove_document(&mut self, doc: DocumentId) -> bool {
        let removed = self.documents.remove(&doc);
        let mut changed = removed.is_some();

        if let Some(target) = removed.and_then(|state| state.target) {
            self.leave(doc, target);
            self.prune(target);
        }

        changed |= self.timers.cancel(doc);

        for source in self.sources.remove(&doc).unwrap_or_default() {
            if let Some(state) = self.documents.get_mut(&source) {
                state.target = None;
            }
            self.prune(source);
            changed = true;
        }

        changed
    }

    /// Sources forwarding to `target`, in ascending id order.
    pub fn sources_of(&self, target: DocumentId) -> Vec<DocumentId> {
        let mut sources: Vec<DocumentId> = self
            .sources
            .get(&target)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        sources.sort_unstable();
        sources
    }

    /// Number of documents with scheduler state.
    pub fn tracked_count(&self) -> usize {
        self.documents.len()
    }

    /// Cancels every timer and forgets every document. Returns the number of
    /// pending saves dropped.
    pub fn clear(&mut self) -> usize {
        let cancelled = self.timers.cancel_all();
        self.documents.clear();
        self.sources.clear();
        cancelled
    }

    /// Asserts the bookkeeping invariants (debug builds only).
    pub fn check_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }

        for (doc, state) in &self.documents {
            if let Some(target) = state.target {
                debug_assert!(
                    self.sources
                        .get(&target)
                        .is_some_and(|set| set.contains(doc)),
                    "{doc} forwards to {target} but is not in its source set"
                );
            }
        }

        for (target, set) in &self.sources {
            debug_assert!(!set.is_empty(), "empty source set kept for {target}");
            for source in set {
                debug_assert_eq!(
                    self.target_of(*source),
                    Some(*target),
                    "{source} listed as source of {target} but forwards elsewhere"
                );
            }
        }

        for target in self.timers.targets() {
            debug_assert!(
                self.documents.contains_key(&target),
                "timer pending for untracked {target}"
            );
        }
    }

    fn leave(&mut self, source: DocumentId, target: DocumentId) {
        if let Some(set) = self.sources.get_mut(&target) {
            set.remove(&source);
            if set.is_empty() {
                self.sources.remove(&target);
            }
        }
    }

    /// Forgets `doc` once nothing refers to it any more.
    fn prune(&mut self, doc: DocumentId) {
        let idle = self.documents.get(&doc).is_some_and(DebounceState::is_idle);
        if idle && !self.timers.is_pending(doc) && !self.sources.contains_key(&doc) {
            self.documents.remove(&doc);
        }
    }
}
