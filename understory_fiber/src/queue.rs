// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-hook update queues and the dispatch handle that feeds them.

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use understory_lanes::Lane;

use crate::error::ReducerError;
use crate::ring::Ring;
use crate::types::FiberId;

/// A state transition function: `(state, action) -> next state`.
pub type Reducer<S, A> = Rc<dyn Fn(&S, &A) -> Result<S, ReducerError>>;

/// One requested state transition.
#[derive(Clone, Debug)]
pub(crate) struct Update<A> {
    pub(crate) action: A,
    pub(crate) lane: Lane,
}

/// Queue shared between a state hook and every [`Dispatch`] handle for it.
pub(crate) struct UpdateQueue<S, A> {
    /// Fiber the hook was mounted on. Handles carry it to locate the tree position.
    pub(crate) fiber: FiberId,
    pub(crate) pending: Ring<Update<A>>,
    /// Updates for lanes already being rendered; moved to `pending` before the next pass.
    pub(crate) interleaved: Ring<Update<A>>,
    pub(crate) last_rendered_reducer: Reducer<S, A>,
    pub(crate) last_rendered_state: S,
}

impl<S, A> UpdateQueue<S, A> {
    pub(crate) fn new(fiber: FiberId, reducer: Reducer<S, A>, state: S) -> Self {
        Self {
            fiber,
            pending: Ring::new(),
            interleaved: Ring::new(),
            last_rendered_reducer: reducer,
            last_rendered_state: state,
        }
    }
}

/// Type-erased access to a queue's interleaved updates, for the root-wide registry.
pub(crate) trait InterleavedQueue {
    /// Move every interleaved update onto the end of the pending queue.
    fn enqueue_interleaved(&self);
}

impl<S, A> InterleavedQueue for RefCell<UpdateQueue<S, A>> {
    fn enqueue_interleaved(&self) {
        let mut queue = self.borrow_mut();
        let interleaved = queue.interleaved.take();
        queue.pending.append(interleaved);
    }
}

/// Action for the basic state reducer used by `use_state`.
pub enum SetStateAction<S> {
    /// Replace the state.
    Set(S),
    /// Compute the next state from the previous one.
    Update(Rc<dyn Fn(&S) -> S>),
}

impl<S> SetStateAction<S> {
    /// Compute the next state from the previous one.
    pub fn update(f: impl Fn(&S) -> S + 'static) -> Self {
        Self::Update(Rc::new(f))
    }
}

impl<S> From<S> for SetStateAction<S> {
    fn from(value: S) -> Self {
        Self::Set(value)
    }
}

impl<S: Clone> Clone for SetStateAction<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Set(value) => Self::Set(value.clone()),
            Self::Update(f) => Self::Update(Rc::clone(f)),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for SetStateAction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(value) => f.debug_tuple("Set").field(value).finish(),
            Self::Update(_) => f.write_str("Update(..)"),
        }
    }
}

pub(crate) fn basic_state_reducer<S: Clone>(
    state: &S,
    action: &SetStateAction<S>,
) -> Result<S, ReducerError> {
    Ok(match action {
        SetStateAction::Set(value) => value.clone(),
        SetStateAction::Update(f) => f(state),
    })
}

/// Handle for enqueuing updates on one state hook.
///
/// Returned by the state hooks and stable across renders: every render of the
/// same hook returns a handle to the same queue.
pub struct Dispatch<S, A> {
    pub(crate) queue: Rc<RefCell<UpdateQueue<S, A>>>,
}

/// Dispatch handle returned by `use_state`.
pub type SetState<S> = Dispatch<S, SetStateAction<S>>;

impl<S, A> Dispatch<S, A> {
    /// The fiber the hook was mounted on.
    pub fn fiber(&self) -> FiberId {
        self.queue.borrow().fiber
    }
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<S, A> PartialEq for Dispatch<S, A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }
}

impl<S, A> Eq for Dispatch<S, A> {}

impl<S, A> fmt::Debug for Dispatch<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fiber = self.queue.try_borrow().map(|queue| queue.fiber).ok();
        f.debug_struct("Dispatch")
            .field("fiber", &fiber)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_reducer_sets_or_updates() {
        assert_eq!(basic_state_reducer(&1, &SetStateAction::Set(5)), Ok(5));
        assert_eq!(
            basic_state_reducer(&1, &SetStateAction::update(|n: &i32| n + 1)),
            Ok(2)
        );
        assert_eq!(basic_state_reducer(&1, &3.into()), Ok(3));
    }

    #[test]
    fn flushing_interleaved_appends_after_pending() {
        let reducer: Reducer<i32, i32> =
            Rc::new(|s: &i32, a: &i32| -> Result<i32, ReducerError> { Ok(s + a) });
        let queue = RefCell::new(UpdateQueue::new(FiberId::new(0, 1), reducer, 0));
        {
            let mut q = queue.borrow_mut();
            q.pending.push(Update {
                action: 1,
                lane: Lane::SYNC,
            });
            q.interleaved.push(Update {
                action: 2,
                lane: Lane::SYNC,
            });
        }
        queue.enqueue_interleaved();
        let q = queue.borrow();
        assert!(q.interleaved.is_empty(), "interleaved slot must be cleared");
        let actions: alloc::vec::Vec<i32> = q.pending.iter().map(|u| u.action).collect();
        assert_eq!(actions, [1, 2]);
    }
}
