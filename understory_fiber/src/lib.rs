// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_fiber --heading-base-level=0

//! Understory Fiber: hook state, update queues, and effects over a dual fiber tree.
//!
//! Every component position in the tree is backed by up to two fibers: the
//! *current* one, which holds what was last committed, and a *work-in-progress*
//! alternate that a render fills in. Rendering a function component rebuilds the
//! hook list of the work-in-progress fiber from the current one, applying queued
//! updates whose [lane](understory_lanes::Lanes) is part of the render.
//!
//! - [`FiberRoot`]: one application; owns the [`FiberTree`] and its [`RootLanes`](understory_lanes::RootLanes).
//! - [`FiberRoot::render_with_hooks`]: render a component with a [`RenderContext`].
//! - [`RenderContext::use_state`], [`RenderContext::use_reducer`],
//!   [`RenderContext::use_effect`], and [`RenderContext::use_layout_effect`]: the hooks.
//! - [`Dispatch`]: stable handle returned by the state hooks; pass it to [`FiberRoot::dispatch`].
//! - [`Host`]: the work loop around this crate; it assigns lanes and schedules work.
//!
//! ## Priority and rebasing
//!
//! Updates outside the render lanes are skipped but not dropped. The first skipped
//! update fixes the base state, and every later update is kept in the base queue
//! so a later render replays them in their original order. Skipped lanes are left
//! on the fiber so the host can schedule them.
//!
//! ## Effects
//!
//! Effects are recorded on the fiber during render and run by the commit helpers
//! [`FiberRoot::commit_hook_effect_list_unmount`] and
//! [`FiberRoot::commit_hook_effect_list_mount`]. An effect whose dependency list
//! did not change is still recorded, without [`HookEffectTags::HAS_EFFECT`].
//!
//! # Example
//!
//! ```rust
//! use understory_fiber::{FiberId, FiberRoot, Host};
//! use understory_lanes::{Lane, Lanes, Timestamp};
//!
//! #[derive(Default)]
//! struct Immediate(Vec<FiberId>);
//!
//! impl Host for Immediate {
//!     fn request_update_lane(&mut self, _: FiberId) -> Lane { Lanes::SYNC }
//!     fn request_event_time(&mut self) -> Timestamp { 0 }
//!     fn schedule_update_on_fiber(&mut self, fiber: FiberId, _: Lane, _: Timestamp) {
//!         self.0.push(fiber);
//!     }
//!     fn is_interleaved_update(&self, _: FiberId, _: Lane) -> bool { false }
//!     fn mark_work_in_progress_received_update(&mut self) {}
//! }
//!
//! let mut host = Immediate::default();
//! let mut root = FiberRoot::new();
//! let host_root = root.current();
//! let counter = root.tree_mut().insert(Some(host_root));
//!
//! // Mount.
//! let (count, set_count) = root
//!     .render_with_hooks(&mut host, None, counter, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
//!     .unwrap();
//! assert_eq!(count, 0);
//!
//! // Two updates, then a render of the alternate.
//! root.dispatch(&mut host, &set_count, 1_i32).unwrap();
//! root.dispatch(&mut host, &set_count, 2_i32).unwrap();
//! assert_eq!(host.0, [counter, counter]);
//!
//! let wip = root.tree_mut().create_work_in_progress(counter).unwrap();
//! let (count, _) = root
//!     .render_with_hooks(&mut host, Some(counter), wip, |cx, _| cx.use_state(0_i32), &(), Lanes::SYNC)
//!     .unwrap();
//! assert_eq!(count, 2);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod effect;
mod error;
mod hook;
mod host;
mod queue;
mod render;
mod ring;
mod root;
mod tree;
mod types;

#[cfg(test)]
mod testing;

pub use effect::{DepValue, Deps, Destroy, Effect, EffectList};
pub use error::{Error, ReducerError, Unsupported};
pub use host::Host;
pub use queue::{Dispatch, Reducer, SetState, SetStateAction};
pub use render::{Dispatcher, RenderContext};
pub use root::FiberRoot;
pub use tree::{Fiber, FiberTree};
pub use types::{FiberFlags, FiberId, HookEffectTags, WorkTag};
