// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber arena: tree structure, alternate pairing, and lane propagation.

use alloc::vec::Vec;
use tracing::debug;
use understory_lanes::{Lane, Lanes};

use crate::effect::EffectList;
use crate::hook::{Hook, StateHook};
use crate::types::{FiberFlags, FiberId, WorkTag};

/// One component instance at one tree position, on one side of the dual tree.
#[derive(Clone, Debug)]
pub struct Fiber {
    generation: u32,
    tag: WorkTag,
    /// Hook list of the last render, `None` until a hook was called.
    pub(crate) memoized_state: Option<Vec<Hook>>,
    /// Effect list of the last render.
    pub(crate) update_queue: Option<EffectList>,
    pub(crate) lanes: Lanes,
    pub(crate) child_lanes: Lanes,
    pub(crate) flags: FiberFlags,
    pub(crate) subtree_flags: FiberFlags,
    child: Option<FiberId>,
    sibling: Option<FiberId>,
    return_fiber: Option<FiberId>,
}

impl Fiber {
    fn new(generation: u32, tag: WorkTag) -> Self {
        Self {
            generation,
            tag,
            memoized_state: None,
            update_queue: None,
            lanes: Lanes::NONE,
            child_lanes: Lanes::NONE,
            flags: FiberFlags::empty(),
            subtree_flags: FiberFlags::empty(),
            child: None,
            sibling: None,
            return_fiber: None,
        }
    }

    /// Kind of work this fiber performs.
    pub fn tag(&self) -> WorkTag {
        self.tag
    }

    /// Lanes with pending work on this fiber.
    pub fn lanes(&self) -> Lanes {
        self.lanes
    }

    /// Lanes with pending work somewhere below this fiber.
    pub fn child_lanes(&self) -> Lanes {
        self.child_lanes
    }

    /// Pending mutations on this fiber.
    pub fn flags(&self) -> FiberFlags {
        self.flags
    }

    /// Pending mutations below this fiber.
    pub fn subtree_flags(&self) -> FiberFlags {
        self.subtree_flags
    }

    /// First child.
    pub fn child(&self) -> Option<FiberId> {
        self.child
    }

    /// Next sibling.
    pub fn sibling(&self) -> Option<FiberId> {
        self.sibling
    }

    /// Parent.
    pub fn return_fiber(&self) -> Option<FiberId> {
        self.return_fiber
    }

    /// True once a render called at least one hook.
    pub fn has_memoized_state(&self) -> bool {
        self.memoized_state.is_some()
    }

    /// Number of hooks called by the last render.
    pub fn hook_count(&self) -> usize {
        self.memoized_state.as_ref().map_or(0, Vec::len)
    }

    /// Effect list of the last render.
    pub fn effects(&self) -> Option<&EffectList> {
        self.update_queue.as_ref()
    }

    /// Memoized value of the state hook at `index`, if it holds an `S`.
    pub fn state<S: 'static>(&self, index: usize) -> Option<&S> {
        match self.memoized_state.as_ref()?.get(index)? {
            Hook::State(slot) => slot.memoized().downcast_ref(),
            Hook::Effect(_) => None,
        }
    }

    pub(crate) fn hook(&self, index: usize) -> Option<&Hook> {
        self.memoized_state.as_ref()?.get(index)
    }

    pub(crate) fn hook_mut(&mut self, index: usize) -> Option<&mut Hook> {
        self.memoized_state.as_mut()?.get_mut(index)
    }

    pub(crate) fn state_hook_mut<S: 'static, A: 'static>(
        &mut self,
        index: usize,
    ) -> Option<&mut StateHook<S, A>> {
        self.hook_mut(index)?.state_mut()
    }
}

impl Default for FiberTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Arena of fibers.
///
/// Both sides of a tree position live in the same arena. The pairing between them
/// is kept in a table parallel to the slots rather than inside the fibers.
pub struct FiberTree {
    slots: Vec<Option<Fiber>>, // fibers
    generations: Vec<u32>,     // last generation per slot (persists across frees)
    alternates: Vec<Option<FiberId>>,
    free_list: Vec<usize>,
}

impl core::fmt::Debug for FiberTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.slots.len();
        let alive = self.slots.iter().filter(|n| n.is_some()).count();
        let paired = self.alternates.iter().filter(|a| a.is_some()).count();
        f.debug_struct("FiberTree")
            .field("fibers_total", &total)
            .field("fibers_alive", &alive)
            .field("fibers_paired", &paired)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl FiberTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            alternates: Vec::new(),
            free_list: Vec::new(),
        }
    }

    fn allocate(&mut self, tag: WorkTag) -> FiberId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(Fiber::new(generation, tag));
            self.alternates[idx] = None;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "FiberId stores 32-bit slot indices."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.slots.push(Some(Fiber::new(generation, tag)));
            self.generations.push(generation);
            self.alternates.push(None);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "FiberId stores 32-bit slot indices."
            )]
            ((self.slots.len() - 1) as u32, generation)
        };
        FiberId::new(idx, generation)
    }

    /// Insert a new function component fiber as the last child of `parent` (or as a
    /// detached root if `None`).
    ///
    /// The new fiber is the current side of its position and has no alternate yet.
    pub fn insert(&mut self, parent: Option<FiberId>) -> FiberId {
        self.insert_with_tag(parent, WorkTag::FunctionComponent)
    }

    pub(crate) fn insert_with_tag(&mut self, parent: Option<FiberId>, tag: WorkTag) -> FiberId {
        let id = self.allocate(tag);
        if let Some(parent) = parent.filter(|p| self.is_alive(*p)) {
            self.link_parent(id, parent);
            self.fiber_mut(id).flags |= FiberFlags::PLACEMENT;
        }
        id
    }

    /// Remove a fiber, its subtree, and the alternates of all of them.
    ///
    /// The parent is flagged with [`FiberFlags::CHILD_DELETION`].
    pub fn remove(&mut self, id: FiberId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.fiber(id).return_fiber.filter(|p| self.is_alive(*p)) {
            self.unlink_parent(id, parent);
        }
        self.detach_subtree(id);
    }

    fn detach_subtree(&mut self, id: FiberId) {
        if !self.is_alive(id) {
            return;
        }
        let mut child = self.fiber(id).child;
        while let Some(c) = child {
            child = self.get(c).and_then(|f| f.sibling);
            self.detach_subtree(c);
        }
        if let Some(alternate) = self.alternate(id) {
            self.free(alternate);
        }
        self.free(id);
    }

    fn free(&mut self, id: FiberId) {
        self.slots[id.idx()] = None;
        self.alternates[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Returns true if `id` refers to a live fiber.
    pub fn is_alive(&self, id: FiberId) -> bool {
        self.slots
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Access a fiber if `id` is live.
    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        let fiber = self.slots.get(id.idx())?.as_ref()?;
        (fiber.generation == id.1).then_some(fiber)
    }

    /// Access a fiber; panics if `id` is stale.
    pub(crate) fn fiber(&self, id: FiberId) -> &Fiber {
        self.get(id).expect("dangling FiberId")
    }

    /// Access a fiber mutably; panics if `id` is stale.
    pub(crate) fn fiber_mut(&mut self, id: FiberId) -> &mut Fiber {
        self.fiber_opt_mut(id).expect("dangling FiberId")
    }

    fn fiber_opt_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        let n = self.slots.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    /// The paired fiber on the other side of the dual tree, if one was created.
    pub fn alternate(&self, id: FiberId) -> Option<FiberId> {
        if !self.is_alive(id) {
            return None;
        }
        self.alternates[id.idx()].filter(|alt| self.is_alive(*alt))
    }

    /// Get the work-in-progress side for the position of `current`.
    ///
    /// The alternate is allocated on first use and reused afterwards. Either way it
    /// starts from `current`: lanes, tree links, the hook list, and the effect list are
    /// copied, and pending mutation flags are cleared. Returns `None` if `current` is
    /// stale.
    pub fn create_work_in_progress(&mut self, current: FiberId) -> Option<FiberId> {
        if !self.is_alive(current) {
            return None;
        }
        let wip = match self.alternate(current) {
            Some(wip) => wip,
            None => {
                let wip = self.allocate(self.fiber(current).tag);
                self.alternates[current.idx()] = Some(wip);
                self.alternates[wip.idx()] = Some(current);
                wip
            }
        };
        let mut fiber = self.fiber(current).clone();
        fiber.generation = wip.1;
        fiber.flags = FiberFlags::empty();
        fiber.subtree_flags = FiberFlags::empty();
        self.slots[wip.idx()] = Some(fiber);
        Some(wip)
    }

    /// Skip re-rendering `work_in_progress` and keep the effects of `current`.
    ///
    /// The effect list is copied verbatim, pending effect flags are cleared, and the
    /// satisfied `lanes` are removed from `current`; any lower-priority work left on
    /// it stays pending.
    pub fn bailout_hooks(&mut self, current: FiberId, work_in_progress: FiberId, lanes: Lanes) {
        if !self.is_alive(current) || !self.is_alive(work_in_progress) {
            return;
        }
        let update_queue = self.fiber(current).update_queue.clone();
        let wip = self.fiber_mut(work_in_progress);
        wip.update_queue = update_queue;
        wip.flags.remove(FiberFlags::PASSIVE | FiberFlags::UPDATE);

        let current_fiber = self.fiber_mut(current);
        current_fiber.lanes = current_fiber.lanes.remove(lanes);
        debug!(?current, ?work_in_progress, ?lanes, "bailed out of hooks");
    }

    /// Mark `lane` on `fiber` and its alternate, and on the child lanes of every
    /// ancestor on both sides. Returns false if `fiber` is stale.
    pub(crate) fn mark_update_lane_from_fiber_to_root(&mut self, fiber: FiberId, lane: Lane) -> bool {
        if !self.is_alive(fiber) {
            return false;
        }
        self.fiber_mut(fiber).lanes |= lane;
        if let Some(alternate) = self.alternate(fiber) {
            self.fiber_mut(alternate).lanes |= lane;
        }
        let mut parent = self.fiber(fiber).return_fiber;
        while let Some(p) = parent.filter(|p| self.is_alive(*p)) {
            self.fiber_mut(p).child_lanes |= lane;
            if let Some(alternate) = self.alternate(p) {
                self.fiber_mut(alternate).child_lanes |= lane;
            }
            parent = self.fiber(p).return_fiber;
        }
        true
    }

    fn link_parent(&mut self, id: FiberId, parent: FiberId) {
        let mut last = self.fiber(parent).child;
        match last {
            None => self.fiber_mut(parent).child = Some(id),
            Some(_) => {
                while let Some(next) = last.and_then(|l| self.fiber(l).sibling) {
                    last = Some(next);
                }
                if let Some(last) = last {
                    self.fiber_mut(last).sibling = Some(id);
                }
            }
        }
        self.fiber_mut(id).return_fiber = Some(parent);
    }

    fn unlink_parent(&mut self, id: FiberId, parent: FiberId) {
        let next = self.fiber(id).sibling;
        let sides = [Some(parent), self.alternate(parent)];
        for side in sides.into_iter().flatten() {
            if self.fiber(side).child == Some(id) {
                let p = self.fiber_mut(side);
                p.child = next;
                p.flags |= FiberFlags::CHILD_DELETION;
                continue;
            }
            let mut cursor = self.fiber(side).child;
            while let Some(c) = cursor {
                let sibling = self.get(c).and_then(|f| f.sibling);
                if sibling == Some(id) {
                    self.fiber_mut(c).sibling = next;
                    break;
                }
                cursor = sibling;
            }
            self.fiber_mut(side).flags |= FiberFlags::CHILD_DELETION;
        }
        let fiber = self.fiber_mut(id);
        fiber.return_fiber = None;
        fiber.sibling = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: Lane = Lanes::from_index(4);

    fn children(tree: &FiberTree, parent: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut child = tree.fiber(parent).child();
        while let Some(c) = child {
            out.push(c);
            child = tree.fiber(c).sibling();
        }
        out
    }

    #[test]
    fn insert_links_children_in_order() {
        let mut tree = FiberTree::new();
        let root = tree.insert_with_tag(None, WorkTag::HostRoot);
        let a = tree.insert(Some(root));
        let b = tree.insert(Some(root));
        let c = tree.insert(Some(root));
        assert_eq!(children(&tree, root), [a, b, c]);
        assert_eq!(tree.fiber(b).return_fiber(), Some(root));
        assert!(tree.fiber(a).flags().contains(FiberFlags::PLACEMENT));
        assert!(
            !tree.fiber(root).flags().contains(FiberFlags::PLACEMENT),
            "detached roots are not placed"
        );
    }

    #[test]
    fn liveness_insert_remove_reuse() {
        let mut tree = FiberTree::new();
        let root = tree.insert(None);
        let a = tree.insert(Some(root));
        assert!(tree.is_alive(a));

        tree.remove(a);
        assert!(!tree.is_alive(a));
        assert!(tree.get(a).is_none());
        assert!(tree.fiber(root).flags().contains(FiberFlags::CHILD_DELETION));

        let b = tree.insert(Some(root));
        assert!(tree.is_alive(b));
        assert!(!tree.is_alive(a), "stale ids never alias a new fiber");
        if a.0 == b.0 {
            assert!(b.1 > a.1, "generation must increase on reuse");
        }
    }

    #[test]
    fn remove_unlinks_middle_child() {
        let mut tree = FiberTree::new();
        let root = tree.insert(None);
        let a = tree.insert(Some(root));
        let b = tree.insert(Some(root));
        let c = tree.insert(Some(root));
        tree.remove(b);
        assert_eq!(children(&tree, root), [a, c]);
    }

    #[test]
    fn remove_detaches_subtree_and_alternates() {
        let mut tree = FiberTree::new();
        let root = tree.insert(None);
        let a = tree.insert(Some(root));
        let a_child = tree.insert(Some(a));
        let a_wip = tree.create_work_in_progress(a).unwrap();
        let child_wip = tree.create_work_in_progress(a_child).unwrap();

        tree.remove(a);
        for id in [a, a_child, a_wip, child_wip] {
            assert!(!tree.is_alive(id), "{id:?} must be detached");
        }
        assert_eq!(tree.fiber(root).child(), None);
    }

    #[test]
    fn work_in_progress_is_created_once_and_reused() {
        let mut tree = FiberTree::new();
        let root = tree.insert(None);
        let a = tree.insert(Some(root));

        let wip = tree.create_work_in_progress(a).unwrap();
        assert_ne!(wip, a);
        assert_eq!(tree.alternate(a), Some(wip));
        assert_eq!(tree.alternate(wip), Some(a));
        assert!(tree.fiber(wip).flags().is_empty(), "flags start clean");
        assert_eq!(tree.fiber(wip).return_fiber(), Some(root));

        // Swap roles: the old current is reused as the next work-in-progress.
        let next = tree.create_work_in_progress(wip).unwrap();
        assert_eq!(next, a);
        assert_eq!(tree.alternate(a), Some(wip));
    }

    #[test]
    fn work_in_progress_copies_lanes() {
        let mut tree = FiberTree::new();
        let a = tree.insert(None);
        tree.fiber_mut(a).lanes = LOW;
        let wip = tree.create_work_in_progress(a).unwrap();
        assert_eq!(tree.fiber(wip).lanes(), LOW);
    }

    #[test]
    fn stale_current_has_no_work_in_progress() {
        let mut tree = FiberTree::new();
        let a = tree.insert(None);
        tree.remove(a);
        assert_eq!(tree.create_work_in_progress(a), None);
    }

    #[test]
    fn update_lane_propagates_to_ancestors_on_both_sides() {
        let mut tree = FiberTree::new();
        let root = tree.insert(None);
        let parent = tree.insert(Some(root));
        let leaf = tree.insert(Some(parent));
        let root_wip = tree.create_work_in_progress(root).unwrap();
        let leaf_wip = tree.create_work_in_progress(leaf).unwrap();

        assert!(tree.mark_update_lane_from_fiber_to_root(leaf, LOW));
        assert_eq!(tree.fiber(leaf).lanes(), LOW);
        assert_eq!(tree.fiber(leaf_wip).lanes(), LOW);
        assert_eq!(tree.fiber(parent).child_lanes(), LOW);
        assert_eq!(tree.fiber(root).child_lanes(), LOW);
        assert_eq!(tree.fiber(root_wip).child_lanes(), LOW);
        assert!(tree.fiber(root).lanes().is_empty(), "ancestors only get child lanes");

        tree.remove(leaf);
        assert!(!tree.mark_update_lane_from_fiber_to_root(leaf, Lanes::SYNC));
    }

    #[test]
    fn bailout_keeps_effects_and_lower_priority_lanes() {
        let mut tree = FiberTree::new();
        let a = tree.insert(None);
        tree.fiber_mut(a).update_queue = Some(EffectList::default());
        tree.fiber_mut(a).lanes = Lanes::SYNC | LOW;
        let wip = tree.create_work_in_progress(a).unwrap();
        tree.fiber_mut(wip).update_queue = None;
        tree.fiber_mut(wip).flags = FiberFlags::PASSIVE | FiberFlags::UPDATE | FiberFlags::PLACEMENT;

        tree.bailout_hooks(a, wip, Lanes::SYNC);
        assert!(tree.fiber(wip).effects().is_some(), "effect list copied from current");
        assert_eq!(tree.fiber(wip).flags(), FiberFlags::PLACEMENT);
        assert_eq!(tree.fiber(a).lanes(), LOW, "lower-priority work stays pending");
    }
}
