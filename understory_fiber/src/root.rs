// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The application root: fiber arena, root lanes, dispatch, and effect commit.

use alloc::rc::Rc;
use alloc::vec::Vec;
use tracing::{debug, trace, warn};
use understory_lanes::{Lanes, RootConfig, RootLanes, Timestamp};

use crate::effect::Effect;
use crate::error::{Error, Unsupported};
use crate::host::Host;
use crate::queue::{Dispatch, InterleavedQueue, Update};
use crate::tree::FiberTree;
use crate::types::{FiberId, HookEffectTags, WorkTag};

/// One application: a fiber tree under a host root, plus its lane bookkeeping.
pub struct FiberRoot {
    pub(crate) tree: FiberTree,
    pub(crate) lanes: RootLanes,
    current: FiberId,
    /// Queues holding interleaved updates, in the order they first received one.
    interleaved: Vec<(FiberId, Rc<dyn InterleavedQueue>)>,
}

impl core::fmt::Debug for FiberRoot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FiberRoot")
            .field("tree", &self.tree)
            .field("lanes", &self.lanes)
            .field("current", &self.current)
            .field("interleaved", &self.interleaved.len())
            .finish()
    }
}

impl Default for FiberRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl FiberRoot {
    /// Create a root with the default lane configuration.
    pub fn new() -> Self {
        Self::with_config(RootConfig::default())
    }

    /// Create a root with an explicit lane configuration.
    pub fn with_config(config: RootConfig) -> Self {
        let mut tree = FiberTree::new();
        let current = tree.insert_with_tag(None, WorkTag::HostRoot);
        Self {
            tree,
            lanes: RootLanes::with_config(config),
            current,
            interleaved: Vec::new(),
        }
    }

    /// The host root fiber of the committed tree.
    pub fn current(&self) -> FiberId {
        self.current
    }

    /// Make `finished_work` the committed host root.
    ///
    /// `finished_work` must be the current host root or its alternate.
    pub fn set_current(&mut self, finished_work: FiberId) -> Result<(), Error> {
        if finished_work != self.current && self.tree.alternate(self.current) != Some(finished_work)
        {
            return Err(Error::StaleFiber(finished_work));
        }
        self.current = finished_work;
        Ok(())
    }

    /// The fiber arena.
    pub fn tree(&self) -> &FiberTree {
        &self.tree
    }

    /// The fiber arena, mutably.
    pub fn tree_mut(&mut self) -> &mut FiberTree {
        &mut self.tree
    }

    /// Pending, expired, and timing state of every lane.
    pub fn lanes(&self) -> &RootLanes {
        &self.lanes
    }

    /// Lane bookkeeping, mutably.
    pub fn lanes_mut(&mut self) -> &mut RootLanes {
        &mut self.lanes
    }

    /// Lanes to render next, given the lanes of a render already in progress.
    pub fn next_lanes(&self, wip_lanes: Lanes) -> Result<Lanes, Error> {
        Ok(self.lanes.get_next_lanes(wip_lanes)?)
    }

    /// Assign timeouts to pending lanes and expire the ones that are overdue.
    pub fn mark_starved_lanes_as_expired(&mut self, now: Timestamp) -> Result<(), Error> {
        Ok(self.lanes.mark_starved_lanes_as_expired(now)?)
    }

    /// Record a commit that left `remaining_lanes` unprocessed.
    pub fn mark_root_finished(&mut self, remaining_lanes: Lanes) {
        self.lanes.mark_root_finished(remaining_lanes);
    }

    /// Skip re-rendering `work_in_progress`; see [`FiberTree::bailout_hooks`].
    pub fn bailout_hooks(&mut self, current: FiberId, work_in_progress: FiberId, lanes: Lanes) {
        self.tree.bailout_hooks(current, work_in_progress, lanes);
    }

    /// Enqueue `action` on the hook behind `handle` and schedule its fiber.
    ///
    /// This is the entry point for updates from outside a render, such as event
    /// handlers. Updates for a fiber that is no longer mounted are dropped with a
    /// warning.
    ///
    /// If neither side of the fiber has pending work, the new state is computed
    /// right away; when it equals the last rendered state the update is queued but
    /// nothing is scheduled.
    pub fn dispatch<S, A>(
        &mut self,
        host: &mut dyn Host,
        handle: &Dispatch<S, A>,
        action: impl Into<A>,
    ) -> Result<(), Error>
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        self.dispatch_action(host, None, handle, action.into())
    }

    pub(crate) fn dispatch_action<S, A>(
        &mut self,
        host: &mut dyn Host,
        rendering: Option<FiberId>,
        handle: &Dispatch<S, A>,
        action: A,
    ) -> Result<(), Error>
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        let fiber = handle.fiber();
        let lane = host.request_update_lane(fiber);
        let event_time = host.request_event_time();

        let alternate = self.tree.alternate(fiber);
        if rendering.is_some_and(|r| r == fiber || Some(r) == alternate) {
            return Err(Unsupported::RenderPhaseUpdate { fiber }.into());
        }
        if !self.tree.is_alive(fiber) {
            warn!(?fiber, "dropped an update for a fiber that is no longer mounted");
            return Ok(());
        }

        let interleaved = host.is_interleaved_update(fiber, lane);
        let idle = self.tree.fiber(fiber).lanes.is_empty()
            && alternate.is_none_or(|alt| self.tree.fiber(alt).lanes.is_empty());
        // The eager state is computed before the update is queued, against the state
        // of the last render. The queue is not borrowed while the reducer runs.
        let eager = idle.then(|| {
            let (reducer, last_state) = {
                let queue = handle.queue.borrow();
                (
                    Rc::clone(&queue.last_rendered_reducer),
                    queue.last_rendered_state.clone(),
                )
            };
            reducer(&last_state, &action).map(|state| state == last_state)
        });

        let update = Update { action, lane };
        if interleaved {
            let mut queue = handle.queue.borrow_mut();
            if queue.interleaved.is_empty() {
                let erased: Rc<dyn InterleavedQueue> = handle.queue.clone();
                self.interleaved.push((fiber, erased));
            }
            queue.interleaved.push(update);
        } else {
            handle.queue.borrow_mut().pending.push(update);
        }

        match eager {
            Some(Ok(true)) => {
                trace!(?fiber, ?lane, "eager state unchanged, nothing scheduled");
                return Ok(());
            }
            Some(Err(err)) => {
                // Reported again when the render applies the update.
                trace!(?fiber, %err, "eager reducer failed");
            }
            Some(Ok(false)) | None => {}
        }

        self.tree.mark_update_lane_from_fiber_to_root(fiber, lane);
        self.lanes.mark_root_updated(lane, event_time);
        debug!(?fiber, ?lane, event_time, interleaved, "scheduled update");
        host.schedule_update_on_fiber(fiber, lane, event_time);
        Ok(())
    }

    /// Fibers whose queues hold interleaved updates, in arrival order.
    pub fn interleaved_fibers(&self) -> impl Iterator<Item = FiberId> + '_ {
        self.interleaved.iter().map(|(fiber, _)| *fiber)
    }

    /// Move every interleaved update to the end of its queue's pending updates.
    ///
    /// Call this before starting a new render pass. Returns the number of queues
    /// that were flushed.
    pub fn enqueue_interleaved_updates(&mut self) -> usize {
        let count = self.interleaved.len();
        for (_, queue) in self.interleaved.drain(..) {
            queue.enqueue_interleaved();
        }
        if count > 0 {
            debug!(count, "flushed interleaved updates");
        }
        count
    }

    /// Run the cleanup of every effect on `fiber` whose tag contains `tags`.
    pub fn commit_hook_effect_list_unmount(
        &self,
        fiber: FiberId,
        tags: HookEffectTags,
    ) -> Result<(), Error> {
        for effect in self.matching_effects(fiber, tags)? {
            effect.destroy();
        }
        Ok(())
    }

    /// Run the body of every effect on `fiber` whose tag contains `tags`.
    pub fn commit_hook_effect_list_mount(
        &self,
        fiber: FiberId,
        tags: HookEffectTags,
    ) -> Result<(), Error> {
        for effect in self.matching_effects(fiber, tags)? {
            effect.create();
        }
        Ok(())
    }

    fn matching_effects(&self, fiber: FiberId, tags: HookEffectTags) -> Result<Vec<Rc<Effect>>, Error> {
        let fiber_ref = self.tree.get(fiber).ok_or(Error::StaleFiber(fiber))?;
        Ok(fiber_ref
            .update_queue
            .as_ref()
            .map(|list| list.matching(tags))
            .unwrap_or_default())
    }
}
