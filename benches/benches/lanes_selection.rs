// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use understory_lanes::{Lanes, RootLanes};

fn bench_bits(c: &mut Criterion) {
    let mut group = c.benchmark_group("lane_bits");
    let sets: Vec<Lanes> = (0..1024_u32)
        .map(|i| Lanes::from_bits(i.wrapping_mul(0x9E37_79B9)))
        .collect();
    group.bench_function("highest_priority_lane", |b| {
        b.iter(|| {
            for &lanes in &sets {
                black_box(lanes.highest_priority_lane());
            }
        })
    });
    group.bench_function("pick_arbitrary_index", |b| {
        b.iter(|| {
            for &lanes in &sets {
                black_box(lanes.pick_arbitrary_index());
            }
        })
    });
    group.bench_function("iter_set_lanes", |b| {
        b.iter(|| {
            let mut count = 0_usize;
            for &lanes in &sets {
                count += lanes.iter().count();
            }
            black_box(count)
        })
    });
    group.finish();
}

fn bench_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("root_lanes");
    group.bench_function("starve_then_select_sync", |b| {
        b.iter(|| {
            let mut root = RootLanes::new();
            root.mark_root_updated(Lanes::SYNC, 0);
            root.mark_starved_lanes_as_expired(0).unwrap();
            root.mark_starved_lanes_as_expired(1_000).unwrap();
            let next = root.get_next_lanes(Lanes::NONE).unwrap();
            root.mark_root_finished(Lanes::NONE);
            black_box(next)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_bits, bench_root);
criterion_main!(benches);
