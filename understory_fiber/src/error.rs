// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for rendering and dispatch.

use alloc::borrow::Cow;
use understory_lanes::LaneError;

use crate::types::FiberId;

/// Paths this crate does not implement.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Unsupported {
    /// A component dispatched an update to its own state while rendering.
    #[error("{fiber:?} dispatched an update to itself while rendering")]
    RenderPhaseUpdate {
        /// The fiber that owns the updated hook.
        fiber: FiberId,
    },
    /// A lane computation outside the defined priority table.
    #[error(transparent)]
    Lane(#[from] LaneError),
}

/// Failure reported by a reducer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("reducer failed: {message}")]
pub struct ReducerError {
    message: Cow<'static, str>,
}

impl ReducerError {
    /// Create a reducer error with a message.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message given at construction.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by [`FiberRoot::render_with_hooks`](crate::FiberRoot::render_with_hooks)
/// and by dispatch.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An explicitly unimplemented path was taken.
    #[error("unsupported: {0}")]
    Unsupported(#[from] Unsupported),
    /// A reducer failed while the render applied updates. The render is aborted.
    #[error(transparent)]
    Reducer(#[from] ReducerError),
    /// The component called more hooks than in its previous render.
    #[error("{fiber:?} rendered more hooks than during the previous render (hook {index})")]
    RenderedMoreHooks {
        /// The rendering fiber.
        fiber: FiberId,
        /// Position of the first extra hook.
        index: usize,
    },
    /// The component called fewer hooks than in its previous render.
    #[error("{fiber:?} rendered {rendered} hooks, the previous render had {expected}")]
    RenderedFewerHooks {
        /// The rendering fiber.
        fiber: FiberId,
        /// Hooks called in this render.
        rendered: usize,
        /// Hooks called in the previous render.
        expected: usize,
    },
    /// A hook position changed between state and effect.
    #[error("hook {index} of {fiber:?} was a {previous} hook and is now called as a {requested} hook")]
    HookKindMismatch {
        /// The rendering fiber.
        fiber: FiberId,
        /// Position of the hook.
        index: usize,
        /// Kind recorded by the previous render.
        previous: &'static str,
        /// Kind requested by this render.
        requested: &'static str,
    },
    /// A state hook was called with a different state or action type than before.
    #[error("state hook {index} of {fiber:?} changed its state or action type")]
    HookTypeMismatch {
        /// The rendering fiber.
        fiber: FiberId,
        /// Position of the hook.
        index: usize,
    },
    /// The fiber id does not refer to a mounted fiber.
    #[error("{0:?} is not a live fiber")]
    StaleFiber(FiberId),
    /// The work-in-progress fiber is not the alternate of the given current fiber.
    #[error("{work_in_progress:?} is not the alternate of {current:?}")]
    NotAlternate {
        /// The committed side passed to the render.
        current: FiberId,
        /// The fiber asked to render.
        work_in_progress: FiberId,
    },
}

impl From<LaneError> for Error {
    fn from(err: LaneError) -> Self {
        Self::Unsupported(Unsupported::Lane(err))
    }
}

impl Error {
    /// True for paths this crate does not implement.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// True for hook order violations, after which hook state can no longer be
    /// associated with its call site.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::RenderedMoreHooks { .. }
                | Self::RenderedFewerHooks { .. }
                | Self::HookKindMismatch { .. }
                | Self::HookTypeMismatch { .. }
        )
    }
}
