//! Benchmarks for autosave-core: timer registry hot paths.
//!
//! Every keystroke in a watched document ends in a `postpone`, so that path
//! should stay well under the cost of a keystroke redraw.

use autosave_core::{DocumentId, TimerRegistry};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_secs(5);

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

/// Benchmark re-arming a pending timer (one per keystroke).
fn bench_postpone(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("timer_postpone");

    for targets in [1u64, 100, 10_000] {
        let mut timers = TimerRegistry::new();
        rt.block_on(async {
            for id in 0..targets {
                timers.arm(DocumentId::new(id), INTERVAL, |_, _| async {});
            }
        });

        // block_on also reaps the aborted timer tasks
        group.bench_with_input(BenchmarkId::from_parameter(targets), &targets, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    timers.postpone(black_box(DocumentId::new(0)), INTERVAL, |_, _| async {})
                })
            });
        });
    }

    group.finish();
}

/// Benchmark the idempotent arm path and identity checks.
fn bench_arm_pending(c: &mut Criterion) {
    let rt = runtime();
    let _guard = rt.enter();

    let mut timers = TimerRegistry::new();
    let doc = DocumentId::new(1);
    let id = timers.arm(doc, INTERVAL, |_, _| async {}).unwrap();

    // Only the no-op path runs below, so nothing is spawned per iteration
    c.bench_function("timer_arm_pending", |b| {
        b.iter(|| timers.arm(black_box(doc), INTERVAL, |_, _| async {}));
    });

    c.bench_function("timer_is_current", |b| {
        b.iter(|| timers.is_current(black_box(doc), black_box(id)));
    });
}

criterion_group!(benches, bench_postpone, bench_arm_pending);
criterion_main!(benches);
