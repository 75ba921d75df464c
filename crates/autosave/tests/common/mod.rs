//! Common test utilities for scheduler integration tests.
//!
//! Every fixture runs on a paused tokio clock: `advance_to` moves virtual
//! time to an offset from the fixture's creation, firing any timers due on
//! the way.

use autosave::{
    AutosaveConfig, DebounceScheduler, DocumentId, MemoryHost, RecordingSink, SchedulerBuilder,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

/// Slack allowed when comparing virtual timestamps.
const TOLERANCE: Duration = Duration::from_millis(10);

/// Routes scheduler logs to the test harness. Set `RUST_LOG=autosave=trace`
/// to see them.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scheduler wired to an in-memory host and a recording sink.
pub(crate) struct Fixture {
    pub host: Arc<MemoryHost>,
    pub sink: Arc<RecordingSink>,
    pub scheduler: DebounceScheduler,
    start: Instant,
}

impl Fixture {
    /// Default config; aliases are saved through their base document.
    pub(crate) fn new() -> Self {
        Self::with_config(AutosaveConfig::default())
    }

    pub(crate) fn with_config(config: AutosaveConfig) -> Self {
        let host = Arc::new(MemoryHost::new());
        let aliases = Arc::clone(&host);
        Self::build(host, config, move |doc| aliases.base_of(doc))
    }

    /// Fixture over an existing host with a custom redirect.
    pub(crate) fn build<F>(host: Arc<MemoryHost>, config: AutosaveConfig, redirect: F) -> Self
    where
        F: Fn(DocumentId) -> DocumentId + Send + Sync + 'static,
    {
        init_tracing();
        let sink = Arc::new(RecordingSink::new());
        let scheduler = SchedulerBuilder::new(host.clone())
            .config(config)
            .redirect(redirect)
            .diagnostics(sink.clone())
            .build();

        Self {
            host,
            sink,
            scheduler,
            start: Instant::now(),
        }
    }

    /// Opens a plain document and activates auto-save on it.
    #[allow(dead_code)] // Used in scheduler_integration tests, not churn tests
    pub(crate) async fn open_active(&self) -> DocumentId {
        let doc = self.host.open();
        self.activate(doc).await;
        doc
    }

    pub(crate) async fn activate(&self, doc: DocumentId) {
        self.scheduler
            .activate(doc)
            .await
            .expect("activating a live document succeeds");
    }

    /// Edits `doc` in the host and forwards the resulting notification.
    #[allow(dead_code)] // Used in scheduler_integration tests, not churn tests
    pub(crate) async fn edit(&self, doc: DocumentId) {
        let kind = self.host.edit(doc).expect("edited document is alive");
        self.scheduler.notify(doc, kind).await;
    }

    /// Sleeps until `secs` after the fixture was created.
    #[allow(dead_code)] // Used in scheduler_integration tests, not churn tests
    pub(crate) async fn advance_to(&self, secs: f64) {
        tokio::time::sleep_until(self.start + Duration::from_secs_f64(secs)).await;
    }

    /// Offset of `instant` from the fixture's creation.
    #[allow(dead_code)] // Used in scheduler_integration tests, not churn tests
    pub(crate) fn offset(&self, instant: Instant) -> Duration {
        instant.duration_since(self.start)
    }

    /// Offsets of every successful save of `doc`.
    #[allow(dead_code)] // Used in scheduler_integration tests, not churn tests
    pub(crate) fn saved_at(&self, doc: DocumentId) -> Vec<Duration> {
        self.host
            .save_times(doc)
            .into_iter()
            .map(|instant| self.offset(instant))
            .collect()
    }

    /// Offset at which the pending save of `target` is due.
    #[allow(dead_code)] // Used in scheduler_integration tests, not churn tests
    pub(crate) async fn due_at(&self, target: DocumentId) -> Option<Duration> {
        self.scheduler
            .deadline(target)
            .await
            .map(|deadline| self.offset(deadline))
    }
}

/// Asserts `actual` is `expected_secs` give or take a few milliseconds.
#[track_caller]
#[allow(dead_code)] // Used in scheduler_integration tests, not churn tests
pub(crate) fn assert_at(actual: Duration, expected_secs: f64) {
    let expected = Duration::from_secs_f64(expected_secs);
    let delta = actual.abs_diff(expected);
    assert!(
        delta <= TOLERANCE,
        "expected ~{expected:?}, got {actual:?}"
    );
}
