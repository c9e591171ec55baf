// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering a function component and the hooks it calls.
//!
//! A component is any `FnOnce(&mut RenderContext<'_>, &P) -> Result<R, Error>`. Its
//! hooks are matched to the previous render by call position, so a component must
//! call the same hooks in the same order on every render.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use tracing::{debug, trace};
use understory_lanes::Lanes;

use crate::effect::{Deps, Destroy, EffectInstance, EffectList};
use crate::error::{Error, ReducerError};
use crate::hook::{Hook, StateHook};
use crate::host::Host;
use crate::queue::{
    Dispatch, Reducer, SetState, SetStateAction, Update, UpdateQueue, basic_state_reducer,
};
use crate::ring::Ring;
use crate::root::FiberRoot;
use crate::tree::FiberTree;
use crate::types::{FiberFlags, FiberId, HookEffectTags};

/// Which hook behavior a render uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dispatcher {
    /// First render of a fiber: hooks create their state.
    Mount,
    /// Later renders: hooks read and advance the state of the previous render.
    Update,
}

impl Dispatcher {
    /// `Update` if `current` is mounted and its last render called any hooks.
    pub fn select(tree: &FiberTree, current: Option<FiberId>) -> Self {
        match current.and_then(|id| tree.get(id)) {
            Some(fiber) if fiber.has_memoized_state() => Self::Update,
            _ => Self::Mount,
        }
    }
}

/// The state of one component render, handed to the component.
pub struct RenderContext<'a> {
    root: &'a mut FiberRoot,
    host: &'a mut dyn Host,
    fiber: FiberId,
    current: Option<FiberId>,
    render_lanes: Lanes,
    dispatcher: Dispatcher,
    hook_index: usize,
}

impl fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("fiber", &self.fiber)
            .field("current", &self.current)
            .field("render_lanes", &self.render_lanes)
            .field("dispatcher", &self.dispatcher)
            .field("hook_index", &self.hook_index)
            .finish_non_exhaustive()
    }
}

impl FiberRoot {
    /// Render `component` into `work_in_progress` and return its output.
    ///
    /// `current` is the committed side of the same position, or `None` on first
    /// mount. The hook list and effect list of `work_in_progress` are rebuilt from
    /// scratch; state hooks carry over from `current` and apply the queued updates
    /// whose lane is part of `render_lanes`.
    ///
    /// When `current` is given, `work_in_progress` must be its alternate, as returned
    /// by [`FiberTree::create_work_in_progress`](crate::FiberTree::create_work_in_progress).
    ///
    /// On error the work-in-progress fiber is left partially rendered and must be
    /// discarded; `current` keeps every queued update.
    pub fn render_with_hooks<P, R, C>(
        &mut self,
        host: &mut dyn Host,
        current: Option<FiberId>,
        work_in_progress: FiberId,
        component: C,
        props: &P,
        render_lanes: Lanes,
    ) -> Result<R, Error>
    where
        P: ?Sized,
        C: FnOnce(&mut RenderContext<'_>, &P) -> Result<R, Error>,
    {
        if !self.tree.is_alive(work_in_progress) {
            return Err(Error::StaleFiber(work_in_progress));
        }
        if let Some(current) = current.filter(|id| !self.tree.is_alive(*id)) {
            return Err(Error::StaleFiber(current));
        }
        if let Some(current) = current {
            // The committed side is read-only during a pass.
            if self.tree.alternate(work_in_progress) != Some(current) {
                return Err(Error::NotAlternate {
                    current,
                    work_in_progress,
                });
            }
        }

        let wip = self.tree.fiber_mut(work_in_progress);
        wip.memoized_state = None;
        wip.update_queue = None;
        wip.lanes = Lanes::NONE;

        let dispatcher = Dispatcher::select(&self.tree, current);
        debug!(fiber = ?work_in_progress, ?dispatcher, ?render_lanes, "rendering");

        let mut cx = RenderContext {
            root: self,
            host,
            fiber: work_in_progress,
            current,
            render_lanes,
            dispatcher,
            hook_index: 0,
        };
        let output = component(&mut cx, props)?;

        if dispatcher == Dispatcher::Update {
            let expected = current.map_or(0, |id| cx.root.tree.fiber(id).hook_count());
            if cx.hook_index < expected {
                return Err(Error::RenderedFewerHooks {
                    fiber: work_in_progress,
                    rendered: cx.hook_index,
                    expected,
                });
            }
        }
        Ok(output)
    }
}

impl RenderContext<'_> {
    /// The fiber being rendered.
    pub fn fiber(&self) -> FiberId {
        self.fiber
    }

    /// Lanes included in this render.
    pub fn render_lanes(&self) -> Lanes {
        self.render_lanes
    }

    /// Hook behavior of this render.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher
    }

    /// Local state with an initial value.
    ///
    /// Returns the current value and a stable handle for replacing it.
    pub fn use_state<S>(&mut self, initial: S) -> Result<(S, SetState<S>), Error>
    where
        S: Clone + PartialEq + 'static,
    {
        self.use_state_with(|| initial)
    }

    /// Local state whose initial value is computed only on mount.
    pub fn use_state_with<S>(
        &mut self,
        init: impl FnOnce() -> S,
    ) -> Result<(S, SetState<S>), Error>
    where
        S: Clone + PartialEq + 'static,
    {
        let reducer: Reducer<S, SetStateAction<S>> = Rc::new(basic_state_reducer::<S>);
        match self.dispatcher {
            Dispatcher::Mount => Ok(self.mount_reducer(reducer, init())),
            Dispatcher::Update => self.update_reducer(reducer),
        }
    }

    /// Local state driven by a reducer.
    ///
    /// The reducer passed to the latest render is the one used to process updates.
    /// A reducer error aborts the render.
    pub fn use_reducer<S, A>(
        &mut self,
        reducer: impl Fn(&S, &A) -> Result<S, ReducerError> + 'static,
        initial: S,
    ) -> Result<(S, Dispatch<S, A>), Error>
    where
        S: Clone + PartialEq + 'static,
        A: Clone + 'static,
    {
        let reducer: Reducer<S, A> = Rc::new(reducer);
        match self.dispatcher {
            Dispatcher::Mount => Ok(self.mount_reducer(reducer, initial)),
            Dispatcher::Update => self.update_reducer(reducer),
        }
    }

    /// A passive effect, run after commit.
    ///
    /// `deps` of `None` runs the effect after every render; `Some` runs it on mount
    /// and whenever the list changed from the previous render.
    pub fn use_effect(
        &mut self,
        create: impl FnOnce() -> Option<Destroy> + 'static,
        deps: Option<Deps>,
    ) -> Result<(), Error> {
        self.effect_impl(
            FiberFlags::PASSIVE,
            HookEffectTags::PASSIVE,
            Box::new(create),
            deps,
        )
    }

    /// A layout effect, run synchronously after mutation.
    pub fn use_layout_effect(
        &mut self,
        create: impl FnOnce() -> Option<Destroy> + 'static,
        deps: Option<Deps>,
    ) -> Result<(), Error> {
        self.effect_impl(
            FiberFlags::UPDATE,
            HookEffectTags::LAYOUT,
            Box::new(create),
            deps,
        )
    }

    /// Dispatch an update to another fiber's hook while rendering.
    ///
    /// Updating a hook of the fiber being rendered is not supported.
    pub fn dispatch<S, A>(&mut self, handle: &Dispatch<S, A>, action: impl Into<A>) -> Result<(), Error>
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        self.root
            .dispatch_action(&mut *self.host, Some(self.fiber), handle, action.into())
    }

    fn push_hook(&mut self, hook: Hook) {
        self.root
            .tree
            .fiber_mut(self.fiber)
            .memoized_state
            .get_or_insert_with(Vec::new)
            .push(hook);
        self.hook_index += 1;
    }

    /// Clone the hook at the next position of the current fiber.
    fn current_hook(&self, requested: &'static str) -> Result<Hook, Error> {
        let (fiber, index) = (self.fiber, self.hook_index);
        let hook = self
            .current
            .and_then(|current| self.root.tree.fiber(current).hook(index))
            .ok_or(Error::RenderedMoreHooks { fiber, index })?;
        if hook.kind() != requested {
            return Err(Error::HookKindMismatch {
                fiber,
                index,
                previous: hook.kind(),
                requested,
            });
        }
        Ok(hook.clone())
    }

    fn mount_reducer<S, A>(&mut self, reducer: Reducer<S, A>, initial: S) -> (S, Dispatch<S, A>)
    where
        S: Clone + 'static,
        A: Clone + 'static,
    {
        let queue = Rc::new(RefCell::new(UpdateQueue::new(
            self.fiber,
            reducer,
            initial.clone(),
        )));
        self.push_hook(Hook::State(Box::new(StateHook {
            memoized_state: initial.clone(),
            base_state: initial.clone(),
            base_queue: Ring::new(),
            queue: Rc::clone(&queue),
        })));
        (initial, Dispatch { queue })
    }

    fn update_reducer<S, A>(&mut self, reducer: Reducer<S, A>) -> Result<(S, Dispatch<S, A>), Error>
    where
        S: Clone + PartialEq + 'static,
        A: Clone + 'static,
    {
        let (fiber, index) = (self.fiber, self.hook_index);
        let hook = self.current_hook(Hook::STATE)?;
        let Some(hook) = hook.state::<S, A>().cloned() else {
            return Err(Error::HookTypeMismatch { fiber, index });
        };
        let queue = Rc::clone(&hook.queue);

        // Pending updates join the base queue on both sides, so a render that is
        // thrown away cannot lose them.
        let mut base_queue = hook.base_queue.clone();
        let pending = queue.borrow_mut().pending.take();
        if !pending.is_empty() {
            base_queue.append(pending);
            if let Some(current) = self.current {
                let current_hook = self
                    .root
                    .tree
                    .fiber_mut(current)
                    .state_hook_mut::<S, A>(index)
                    .ok_or(Error::HookTypeMismatch { fiber, index })?;
                current_hook.base_queue = base_queue.clone();
            }
        }

        let mut state = hook.base_state.clone();
        let mut new_base_state = None;
        let mut new_base_queue = Ring::new();
        let mut skipped_lanes = Lanes::NONE;
        for update in base_queue.iter() {
            if !self.render_lanes.contains(update.lane) {
                if new_base_queue.is_empty() {
                    new_base_state = Some(state.clone());
                }
                new_base_queue.push(update.clone());
                skipped_lanes |= update.lane;
                continue;
            }
            if !new_base_queue.is_empty() {
                // Kept so it is applied again on top of the skipped update, but never
                // skipped itself.
                new_base_queue.push(Update {
                    action: update.action.clone(),
                    lane: Lanes::NONE,
                });
            }
            state = reducer(&state, &update.action)?;
        }
        let new_base_state = new_base_state.unwrap_or_else(|| state.clone());

        if !skipped_lanes.is_empty() {
            trace!(?fiber, index, ?skipped_lanes, "skipped updates outside the render lanes");
            self.root.tree.fiber_mut(fiber).lanes |= skipped_lanes;
        }
        if state != hook.memoized_state {
            self.host.mark_work_in_progress_received_update();
        }

        {
            let mut queue = queue.borrow_mut();
            queue.last_rendered_reducer = reducer;
            queue.last_rendered_state = state.clone();
        }
        self.push_hook(Hook::State(Box::new(StateHook {
            memoized_state: state.clone(),
            base_state: new_base_state,
            base_queue: new_base_queue,
            queue: Rc::clone(&queue),
        })));
        Ok((state, Dispatch { queue }))
    }

    fn effect_impl(
        &mut self,
        fiber_flags: FiberFlags,
        hook_flags: HookEffectTags,
        create: Box<dyn FnOnce() -> Option<Destroy>>,
        deps: Option<Deps>,
    ) -> Result<(), Error> {
        let (inst, unchanged) = match self.dispatcher {
            Dispatcher::Mount => (Rc::new(EffectInstance::default()), false),
            Dispatcher::Update => {
                let Hook::Effect(prev) = self.current_hook(Hook::EFFECT)? else {
                    return Err(Error::HookKindMismatch {
                        fiber: self.fiber,
                        index: self.hook_index,
                        previous: Hook::STATE,
                        requested: Hook::EFFECT,
                    });
                };
                let unchanged = deps
                    .as_ref()
                    .is_some_and(|next| prev.deps().is_some_and(|prev| prev == next));
                (Rc::clone(&prev.inst), unchanged)
            }
        };

        let tag = if unchanged {
            hook_flags
        } else {
            self.root.tree.fiber_mut(self.fiber).flags |= fiber_flags;
            HookEffectTags::HAS_EFFECT | hook_flags
        };
        let effect = self
            .root
            .tree
            .fiber_mut(self.fiber)
            .update_queue
            .get_or_insert_with(EffectList::default)
            .push_effect(tag, create, inst, deps);
        self.push_hook(Hook::Effect(effect));
        Ok(())
    }
}
