// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priority rebase.
//!
//! Queues `+1` at a low-priority lane, `*10` at the synchronous lane, and `+5` at
//! the low lane again. A synchronous pass applies only `*10` and keeps the rest
//! in the base queue; the low-priority pass then replays all three in their
//! original order.
//!
//! Run:
//! - `cargo run -p understory_demos --example fiber_priority_rebase`

use understory_fiber::{Dispatch, Error, FiberId, FiberRoot, Host, ReducerError, RenderContext};
use understory_lanes::{Lane, Lanes, Timestamp};

const LOW: Lane = Lanes::from_index(4);

#[derive(Clone, Debug)]
enum Op {
    Add(i64),
    Mul(i64),
}

fn apply(state: &i64, op: &Op) -> Result<i64, ReducerError> {
    match op {
        Op::Add(n) => state.checked_add(*n),
        Op::Mul(n) => state.checked_mul(*n),
    }
    .ok_or_else(|| ReducerError::new("overflow"))
}

struct Scripted {
    next_lane: Lane,
}

impl Host for Scripted {
    fn request_update_lane(&mut self, _fiber: FiberId) -> Lane {
        self.next_lane
    }

    fn request_event_time(&mut self) -> Timestamp {
        0
    }

    fn schedule_update_on_fiber(&mut self, fiber: FiberId, lane: Lane, _event_time: Timestamp) {
        println!("  schedule {fiber:?} on {lane:?}");
    }

    fn is_interleaved_update(&self, _fiber: FiberId, _lane: Lane) -> bool {
        false
    }

    fn mark_work_in_progress_received_update(&mut self) {}
}

fn value(cx: &mut RenderContext<'_>, _props: &()) -> Result<(i64, Dispatch<i64, Op>), Error> {
    cx.use_reducer(apply, 1)
}

fn main() -> Result<(), Error> {
    let mut host = Scripted { next_lane: Lanes::SYNC };
    let mut root = FiberRoot::new();
    let host_root = root.current();
    let fiber = root.tree_mut().insert(Some(host_root));

    let (state, dispatch) = root.render_with_hooks(&mut host, None, fiber, value, &(), Lanes::SYNC)?;
    println!("mounted with {state}");

    for (lane, op) in [(LOW, Op::Add(1)), (Lanes::SYNC, Op::Mul(10)), (LOW, Op::Add(5))] {
        println!("dispatch {op:?} on {lane:?}");
        host.next_lane = lane;
        root.dispatch(&mut host, &dispatch, op)?;
    }
    println!("next lanes: {:?}", root.lanes().pending_lanes());

    let wip = root
        .tree_mut()
        .create_work_in_progress(fiber)
        .ok_or(Error::StaleFiber(fiber))?;
    let (state, _) = root.render_with_hooks(&mut host, Some(fiber), wip, value, &(), Lanes::SYNC)?;
    let left = root.tree().get(wip).map(|f| f.lanes()).unwrap_or_default();
    println!("sync pass: {state} (left pending: {left:?})");
    root.mark_root_finished(left);

    let retry = root
        .tree_mut()
        .create_work_in_progress(wip)
        .ok_or(Error::StaleFiber(wip))?;
    let (state, _) = root.render_with_hooks(&mut host, Some(wip), retry, value, &(), LOW)?;
    println!("low pass: {state}");
    root.mark_root_finished(Lanes::NONE);
    Ok(())
}
