// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Counter with an effect.
//!
//! Mounts a counter component, dispatches updates the way an event handler
//! would, and runs its passive effect after each simulated commit. The effect
//! depends on the count, so it re-runs (cleanup first) only when the count
//! changes.
//!
//! Run:
//! - `cargo run -p understory_demos --example fiber_counter`

use understory_fiber::{
    Error, FiberId, FiberRoot, HookEffectTags, Host, RenderContext, SetState, SetStateAction, deps,
};
use understory_lanes::{Lane, Lanes, Timestamp};

/// Synchronous work loop: every update is sync and remembered until flushed.
#[derive(Default)]
struct SyncLoop {
    clock: Timestamp,
    dirty: Vec<FiberId>,
}

impl Host for SyncLoop {
    fn request_update_lane(&mut self, _fiber: FiberId) -> Lane {
        Lanes::SYNC
    }

    fn request_event_time(&mut self) -> Timestamp {
        self.clock += 1;
        self.clock
    }

    fn schedule_update_on_fiber(&mut self, fiber: FiberId, lane: Lane, event_time: Timestamp) {
        println!("  schedule {fiber:?} on {lane:?} at t={event_time}");
        if !self.dirty.contains(&fiber) {
            self.dirty.push(fiber);
        }
    }

    fn is_interleaved_update(&self, _fiber: FiberId, _lane: Lane) -> bool {
        false
    }

    fn mark_work_in_progress_received_update(&mut self) {
        println!("  state changed");
    }
}

fn counter(cx: &mut RenderContext<'_>, label: &str) -> Result<(i32, SetState<i32>), Error> {
    let (count, set_count) = cx.use_state(0_i32)?;
    let label = label.to_owned();
    cx.use_effect(
        move || {
            println!("  effect: {label} = {count}");
            let label = label.clone();
            Some(Box::new(move || println!("  cleanup: {label} was {count}")))
        },
        Some(deps![count]),
    )?;
    Ok((count, set_count))
}

fn commit(root: &mut FiberRoot, fiber: FiberId) -> Result<(), Error> {
    let passive = HookEffectTags::HAS_EFFECT | HookEffectTags::PASSIVE;
    root.commit_hook_effect_list_unmount(fiber, passive)?;
    root.commit_hook_effect_list_mount(fiber, passive)?;
    root.mark_root_finished(Lanes::NONE);
    Ok(())
}

fn main() -> Result<(), Error> {
    let mut host = SyncLoop::default();
    let mut root = FiberRoot::new();
    let host_root = root.current();
    let mut current = root.tree_mut().insert(Some(host_root));

    println!("== Mount ==");
    let (count, set_count) =
        root.render_with_hooks(&mut host, None, current, counter, "clicks", Lanes::SYNC)?;
    println!("rendered {count}");
    commit(&mut root, current)?;

    let batches: [&[SetStateAction<i32>]; 3] = [
        &[
            SetStateAction::update(|n: &i32| n + 1),
            SetStateAction::update(|n: &i32| n + 1),
        ],
        &[SetStateAction::Set(2)],
        &[SetStateAction::update(|n: &i32| n * 10)],
    ];
    for (i, batch) in batches.iter().enumerate() {
        println!("== Batch {i} ==");
        for action in batch.iter() {
            root.dispatch(&mut host, &set_count, action.clone())?;
        }
        if host.dirty.is_empty() {
            println!("  nothing scheduled");
            continue;
        }
        host.dirty.clear();

        let wip = root
            .tree_mut()
            .create_work_in_progress(current)
            .ok_or(Error::StaleFiber(current))?;
        let (count, _) =
            root.render_with_hooks(&mut host, Some(current), wip, counter, "clicks", Lanes::SYNC)?;
        println!("rendered {count}");
        commit(&mut root, wip)?;
        current = wip;
    }
    Ok(())
}
