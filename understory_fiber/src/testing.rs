// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A recording host for unit tests.

use alloc::vec::Vec;
use understory_lanes::{Lane, Lanes, Timestamp};

use crate::host::Host;
use crate::types::FiberId;

/// Hands out a fixed lane and records every call.
#[derive(Debug)]
pub(crate) struct TestHost {
    pub(crate) lane: Lane,
    pub(crate) now: Timestamp,
    /// Lanes already being rendered; updates on them are interleaved.
    pub(crate) rendering_lanes: Lanes,
    pub(crate) scheduled: Vec<(FiberId, Lane, Timestamp)>,
    pub(crate) received_updates: usize,
}

impl Default for TestHost {
    fn default() -> Self {
        Self {
            lane: Lanes::SYNC,
            now: 0,
            rendering_lanes: Lanes::NONE,
            scheduled: Vec::new(),
            received_updates: 0,
        }
    }
}

impl Host for TestHost {
    fn request_update_lane(&mut self, _fiber: FiberId) -> Lane {
        self.lane
    }

    fn request_event_time(&mut self) -> Timestamp {
        self.now
    }

    fn schedule_update_on_fiber(&mut self, fiber: FiberId, lane: Lane, event_time: Timestamp) {
        self.scheduled.push((fiber, lane, event_time));
    }

    fn is_interleaved_update(&self, _fiber: FiberId, lane: Lane) -> bool {
        self.rendering_lanes.includes_some(lane)
    }

    fn mark_work_in_progress_received_update(&mut self) {
        self.received_updates += 1;
    }
}
