// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_fiber::{Dispatch, FiberId, FiberRoot, Host, ReducerError, RenderContext};
use understory_lanes::{Lane, Lanes, Timestamp};

const LOW: Lane = Lanes::from_index(4);

struct Bench {
    lane: Lane,
}

impl Host for Bench {
    fn request_update_lane(&mut self, _fiber: FiberId) -> Lane {
        self.lane
    }

    fn request_event_time(&mut self) -> Timestamp {
        0
    }

    fn schedule_update_on_fiber(&mut self, _fiber: FiberId, _lane: Lane, _event_time: Timestamp) {}

    fn is_interleaved_update(&self, _fiber: FiberId, _lane: Lane) -> bool {
        false
    }

    fn mark_work_in_progress_received_update(&mut self) {}
}

fn add(state: &u64, action: &u64) -> Result<u64, ReducerError> {
    Ok(state.wrapping_add(*action))
}

fn counter(
    cx: &mut RenderContext<'_>,
    _props: &(),
) -> Result<(u64, Dispatch<u64, u64>), understory_fiber::Error> {
    cx.use_reducer(add, 0)
}

/// A mounted counter with `n` queued updates; every `skip_every`th one is low priority.
fn setup(n: usize, skip_every: usize) -> (FiberRoot, Bench, FiberId) {
    let mut host = Bench { lane: Lanes::SYNC };
    let mut root = FiberRoot::new();
    let host_root = root.current();
    let fiber = root.tree_mut().insert(Some(host_root));
    let (_, dispatch) = root
        .render_with_hooks(&mut host, None, fiber, counter, &(), Lanes::SYNC)
        .unwrap();
    for i in 0..n {
        host.lane = if skip_every > 0 && i % skip_every == 0 {
            LOW
        } else {
            Lanes::SYNC
        };
        root.dispatch(&mut host, &dispatch, i as u64).unwrap();
    }
    (root, host, fiber)
}

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_queue_fold");
    for &n in &[16usize, 256, 4096] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("render_sync_n{}", n), |b| {
            b.iter_batched(
                || setup(n, 0),
                |(mut root, mut host, fiber)| {
                    let wip = root.tree_mut().create_work_in_progress(fiber).unwrap();
                    let (value, _) = root
                        .render_with_hooks(&mut host, Some(fiber), wip, counter, &(), Lanes::SYNC)
                        .unwrap();
                    black_box(value);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_rebase(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_queue_rebase");
    for &n in &[16usize, 256, 4096] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("skip_then_replay_n{}", n), |b| {
            b.iter_batched(
                || setup(n, 4),
                |(mut root, mut host, fiber)| {
                    let wip = root.tree_mut().create_work_in_progress(fiber).unwrap();
                    root.render_with_hooks(&mut host, Some(fiber), wip, counter, &(), Lanes::SYNC)
                        .unwrap();
                    let retry = root.tree_mut().create_work_in_progress(wip).unwrap();
                    let (value, _) = root
                        .render_with_hooks(&mut host, Some(wip), retry, counter, &(), LOW)
                        .unwrap();
                    black_box(value);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fold, bench_rebase);
criterion_main!(benches);
