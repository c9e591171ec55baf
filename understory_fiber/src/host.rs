// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scheduler-facing side of dispatch and render.

use understory_lanes::{Lane, Timestamp};

use crate::types::FiberId;

/// Services the surrounding work loop provides to dispatch and render.
///
/// The fiber crate never decides when work runs. It asks the host which lane an
/// update belongs to, tells it which fiber needs work, and reports when a render
/// produced a different state.
pub trait Host {
    /// Lane for a new update on `fiber`.
    fn request_update_lane(&mut self, fiber: FiberId) -> Lane;

    /// Timestamp for a new update.
    fn request_event_time(&mut self) -> Timestamp;

    /// `fiber` has pending work in `lane` that was first requested at `event_time`.
    fn schedule_update_on_fiber(&mut self, fiber: FiberId, lane: Lane, event_time: Timestamp);

    /// True if an update on `lane` arrives while a render of that lane is already in
    /// progress, so it must wait for the next pass.
    fn is_interleaved_update(&self, fiber: FiberId, lane: Lane) -> bool;

    /// The fiber being rendered produced a state different from its last render.
    fn mark_work_in_progress_received_update(&mut self);
}
