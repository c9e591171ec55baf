// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end render passes driven through the public API.

use std::cell::Cell;
use std::rc::Rc;

use understory_fiber::{
    Deps, FiberFlags, FiberId, FiberRoot, HookEffectTags, Host, SetStateAction,
};
use understory_lanes::{Lane, Lanes, Timestamp};

const LOW: Lane = Lanes::from_index(4);

/// A work loop that records what it is asked to do.
struct Loop {
    lane: Lane,
    now: Timestamp,
    rendering: Lanes,
    scheduled: Vec<(FiberId, Lane)>,
}

impl Default for Loop {
    fn default() -> Self {
        Self {
            lane: Lanes::SYNC,
            now: 0,
            rendering: Lanes::NONE,
            scheduled: Vec::new(),
        }
    }
}

impl Host for Loop {
    fn request_update_lane(&mut self, _fiber: FiberId) -> Lane {
        self.lane
    }

    fn request_event_time(&mut self) -> Timestamp {
        self.now
    }

    fn schedule_update_on_fiber(&mut self, fiber: FiberId, lane: Lane, _event_time: Timestamp) {
        self.scheduled.push((fiber, lane));
    }

    fn is_interleaved_update(&self, _fiber: FiberId, lane: Lane) -> bool {
        self.rendering.includes_some(lane)
    }

    fn mark_work_in_progress_received_update(&mut self) {}
}

fn mount_child(root: &mut FiberRoot) -> FiberId {
    let host_root = root.current();
    root.tree_mut().insert(Some(host_root))
}

fn increment() -> SetStateAction<i32> {
    SetStateAction::update(|n: &i32| n + 1)
}

#[test]
fn two_increments_before_a_render_yield_two() {
    let mut host = Loop::default();
    let mut root = FiberRoot::new();
    let counter = mount_child(&mut root);
    let (count, set) = root
        .render_with_hooks(&mut host, None, counter, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
        .unwrap();
    assert_eq!(count, 0);

    root.dispatch(&mut host, &set, increment()).unwrap();
    root.dispatch(&mut host, &set, increment()).unwrap();
    assert_eq!(host.scheduled, [(counter, Lanes::SYNC), (counter, Lanes::SYNC)]);

    let wip = root.tree_mut().create_work_in_progress(counter).unwrap();
    let (count, _) = root
        .render_with_hooks(&mut host, Some(counter), wip, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(root.tree().get(wip).unwrap().state::<i32>(0), Some(&2));
}

#[test]
fn effect_with_empty_deps_runs_on_mount_only() {
    let mut host = Loop::default();
    let mut root = FiberRoot::new();
    let fiber = mount_child(&mut root);
    let ran = Rc::new(Cell::new(0));
    let passive = HookEffectTags::HAS_EFFECT | HookEffectTags::PASSIVE;

    let render = |root: &mut FiberRoot, host: &mut Loop, current, wip| {
        let ran = Rc::clone(&ran);
        root.render_with_hooks(
            host,
            current,
            wip,
            |cx, _| {
                cx.use_effect(
                    move || {
                        ran.set(ran.get() + 1);
                        None
                    },
                    Some(Deps::new()),
                )
            },
            &(),
            Lanes::SYNC,
        )
        .unwrap();
        root.commit_hook_effect_list_unmount(wip, passive).unwrap();
        root.commit_hook_effect_list_mount(wip, passive).unwrap();
    };

    render(&mut root, &mut host, None, fiber);
    assert_eq!(ran.get(), 1);

    let mut current = fiber;
    for _ in 0..3 {
        let wip = root.tree_mut().create_work_in_progress(current).unwrap();
        render(&mut root, &mut host, Some(current), wip);
        let rendered = root.tree().get(wip).unwrap();
        assert!(!rendered.flags().contains(FiberFlags::PASSIVE), "not re-flagged");
        let effect = rendered.effects().unwrap().last_effect().unwrap();
        assert!(!effect.tag().contains(HookEffectTags::HAS_EFFECT));
        current = wip;
    }
    assert_eq!(ran.get(), 1);
}

#[test]
fn interrupted_low_priority_work_stays_pending() {
    let mut host = Loop::default();
    let mut root = FiberRoot::new();
    let fiber = mount_child(&mut root);
    let (_, set) = root
        .render_with_hooks(&mut host, None, fiber, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
        .unwrap();

    // A low-priority update starts rendering.
    host.lane = LOW;
    root.dispatch(&mut host, &set, increment()).unwrap();
    let wip = root.tree_mut().create_work_in_progress(fiber).unwrap();
    let (low, _) = root
        .render_with_hooks(&mut host, Some(fiber), wip, |cx, _| cx.use_state(0_i32), &(), LOW)
        .unwrap();
    assert_eq!(low, 1);

    // A synchronous update arrives before the low render commits and preempts it.
    host.lane = Lanes::SYNC;
    root.dispatch(&mut host, &set, SetStateAction::update(|n: &i32| n + 10))
        .unwrap();
    assert_eq!(root.next_lanes(LOW), Ok(Lanes::SYNC));

    let wip = root.tree_mut().create_work_in_progress(fiber).unwrap();
    let (high, _) = root
        .render_with_hooks(&mut host, Some(fiber), wip, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
        .unwrap();
    assert_eq!(high, 10, "only the synchronous update applies");

    let remaining = root.tree().get(wip).unwrap().lanes();
    assert_eq!(remaining, LOW);
    root.mark_root_finished(remaining);
    assert_eq!(root.lanes().pending_lanes(), LOW);

    // The retry at the original priority replays both updates in order.
    let retry = root.tree_mut().create_work_in_progress(wip).unwrap();
    let (count, _) = root
        .render_with_hooks(&mut host, Some(wip), retry, |cx, _| cx.use_state(0_i32), &(), LOW)
        .unwrap();
    assert_eq!(count, 11);
    assert!(root.tree().get(retry).unwrap().lanes().is_empty());
}

#[test]
fn update_from_another_render_waits_for_the_flush() {
    let mut host = Loop::default();
    let mut root = FiberRoot::new();
    let sender = mount_child(&mut root);
    let receiver = mount_child(&mut root);
    root.render_with_hooks(&mut host, None, sender, |cx, _| cx.use_state(()), &(), Lanes::SYNC)
        .unwrap();
    let (_, set) = root
        .render_with_hooks(&mut host, None, receiver, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
        .unwrap();

    // One synchronous pass renders the sender, which updates the receiver.
    host.rendering = Lanes::SYNC;
    let sender_wip = root.tree_mut().create_work_in_progress(sender).unwrap();
    root.render_with_hooks(
        &mut host,
        Some(sender),
        sender_wip,
        |cx, _| {
            cx.use_state(())?;
            cx.dispatch(&set, 5_i32)
        },
        &(),
        Lanes::SYNC,
    )
    .unwrap();
    assert_eq!(root.interleaved_fibers().collect::<Vec<_>>(), [receiver]);

    let receiver_wip = root.tree_mut().create_work_in_progress(receiver).unwrap();
    let (seen, _) = root
        .render_with_hooks(&mut host, Some(receiver), receiver_wip, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
        .unwrap();
    assert_eq!(seen, 0, "the in-progress pass does not see the update");

    // Next pass.
    host.rendering = Lanes::NONE;
    assert_eq!(root.enqueue_interleaved_updates(), 1);
    let next = root.tree_mut().create_work_in_progress(receiver_wip).unwrap();
    let (seen, _) = root
        .render_with_hooks(&mut host, Some(receiver_wip), next, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
        .unwrap();
    assert_eq!(seen, 5);
}

#[test]
fn removed_component_ignores_late_updates() {
    let mut host = Loop::default();
    let mut root = FiberRoot::new();
    let fiber = mount_child(&mut root);
    let (_, set) = root
        .render_with_hooks(&mut host, None, fiber, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
        .unwrap();

    root.tree_mut().remove(fiber);
    root.dispatch(&mut host, &set, 1_i32).unwrap();
    assert!(host.scheduled.is_empty());
    assert!(root.lanes().pending_lanes().is_empty());
}
