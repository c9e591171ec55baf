// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hook slots stored on a fiber, matched by call position across renders.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::any::Any;
use core::cell::RefCell;
use core::fmt;

use crate::effect::Effect;
use crate::queue::{Update, UpdateQueue};
use crate::ring::Ring;

/// State of one `use_state` / `use_reducer` call.
pub(crate) struct StateHook<S, A> {
    pub(crate) memoized_state: S,
    /// State after applying only the updates that were eligible so far.
    pub(crate) base_state: S,
    /// Updates carried over from a pass that skipped some of them.
    pub(crate) base_queue: Ring<Update<A>>,
    pub(crate) queue: Rc<RefCell<UpdateQueue<S, A>>>,
}

impl<S: Clone, A: Clone> Clone for StateHook<S, A> {
    fn clone(&self) -> Self {
        Self {
            memoized_state: self.memoized_state.clone(),
            base_state: self.base_state.clone(),
            base_queue: self.base_queue.clone(),
            queue: Rc::clone(&self.queue),
        }
    }
}

/// Type-erased [`StateHook`].
pub(crate) trait StateSlot {
    fn clone_slot(&self) -> Box<dyn StateSlot>;
    fn memoized(&self) -> &dyn Any;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: Clone + 'static, A: Clone + 'static> StateSlot for StateHook<S, A> {
    fn clone_slot(&self) -> Box<dyn StateSlot> {
        Box::new(self.clone())
    }

    fn memoized(&self) -> &dyn Any {
        &self.memoized_state
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn StateSlot> {
    fn clone(&self) -> Self {
        self.clone_slot()
    }
}

/// One hook slot.
#[derive(Clone)]
pub(crate) enum Hook {
    State(Box<dyn StateSlot>),
    Effect(Rc<Effect>),
}

impl Hook {
    pub(crate) const STATE: &'static str = "state";
    pub(crate) const EFFECT: &'static str = "effect";

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::State(_) => Self::STATE,
            Self::Effect(_) => Self::EFFECT,
        }
    }

    pub(crate) fn state<S: 'static, A: 'static>(&self) -> Option<&StateHook<S, A>> {
        match self {
            Self::State(slot) => slot.as_any().downcast_ref(),
            Self::Effect(_) => None,
        }
    }

    pub(crate) fn state_mut<S: 'static, A: 'static>(&mut self) -> Option<&mut StateHook<S, A>> {
        match self {
            Self::State(slot) => slot.as_any_mut().downcast_mut(),
            Self::Effect(_) => None,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(_) => f.write_str("State(..)"),
            Self::Effect(effect) => f.debug_tuple("Effect").field(effect).finish(),
        }
    }
}
