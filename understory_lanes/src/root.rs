// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-root lane bookkeeping: pending and expired lanes, timestamps, and lane selection.

use tracing::debug;

use crate::error::LaneError;
use crate::lanes::{Lane, LaneMap, Lanes, Timestamp};

/// Runtime configuration for a root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootConfig {
    /// How long a pending [`Lanes::SYNC`] update may wait before it is marked expired.
    pub sync_expiration_ms: u64,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            sync_expiration_ms: 250,
        }
    }
}

impl RootConfig {
    /// Expiration time for work on `lane` that became pending at `now`.
    ///
    /// Only the synchronous lane has a defined timeout.
    pub fn expiration_time(&self, lane: Lane, now: Timestamp) -> Result<Timestamp, LaneError> {
        if lane == Lanes::SYNC {
            Ok(now.saturating_add(self.sync_expiration_ms))
        } else {
            Err(LaneError::Unsupported(lane))
        }
    }
}

/// Group `lanes` into the lane set that should be rendered together, starting from
/// its highest-priority lane.
pub fn highest_priority_lanes(lanes: Lanes) -> Result<Lanes, LaneError> {
    match lanes.highest_priority_lane() {
        Lanes::SYNC => Ok(Lanes::SYNC),
        other => Err(LaneError::Unsupported(other)),
    }
}

/// Lane state of one application root.
///
/// Created once per application. Dispatching an update marks its lane pending;
/// finishing a render narrows the pending set to whatever is left.
#[derive(Clone, Debug)]
pub struct RootLanes {
    pending_lanes: Lanes,
    expired_lanes: Lanes,
    expiration_times: LaneMap<Option<Timestamp>>,
    event_times: LaneMap<Option<Timestamp>>,
    config: RootConfig,
}

impl Default for RootLanes {
    fn default() -> Self {
        Self::new()
    }
}

impl RootLanes {
    /// Create a root with nothing pending and the default [`RootConfig`].
    pub fn new() -> Self {
        Self::with_config(RootConfig::default())
    }

    /// Create a root with nothing pending.
    pub fn with_config(config: RootConfig) -> Self {
        Self {
            pending_lanes: Lanes::NONE,
            expired_lanes: Lanes::NONE,
            expiration_times: LaneMap::filled(None),
            event_times: LaneMap::filled(None),
            config,
        }
    }

    /// The configuration this root was created with.
    pub fn config(&self) -> &RootConfig {
        &self.config
    }

    /// Lanes with work waiting somewhere in the tree.
    pub fn pending_lanes(&self) -> Lanes {
        self.pending_lanes
    }

    /// Pending lanes that waited past their expiration time.
    pub fn expired_lanes(&self) -> Lanes {
        self.expired_lanes
    }

    /// Recorded expiration time for `lane`, if any.
    pub fn expiration_time(&self, lane: Lane) -> Option<Timestamp> {
        self.expiration_times.get(lane).copied().flatten()
    }

    /// Event time of the most recent update on `lane`, if any.
    pub fn event_time(&self, lane: Lane) -> Option<Timestamp> {
        self.event_times.get(lane).copied().flatten()
    }

    /// Mark `lane` pending and remember when the update that caused it happened.
    pub fn mark_root_updated(&mut self, lane: Lane, event_time: Timestamp) {
        self.pending_lanes |= lane;
        if let Some(slot) = self.event_times.get_mut(lane) {
            *slot = Some(event_time);
        }
    }

    /// Narrow the pending set after a render committed.
    ///
    /// `remaining` is whatever work is still outstanding in the finished tree.
    /// Lanes that are no longer pending lose their timestamps.
    pub fn mark_root_finished(&mut self, remaining: Lanes) {
        let no_longer_pending = self.pending_lanes.remove(remaining);
        self.pending_lanes = remaining;
        self.expired_lanes = self.expired_lanes.intersect(remaining);
        for (index, _) in no_longer_pending.iter() {
            self.event_times[index] = None;
            self.expiration_times[index] = None;
        }
    }

    /// Assign expiration times to pending lanes that lack one and collect the
    /// lanes whose time has passed into the expired set.
    pub fn mark_starved_lanes_as_expired(&mut self, now: Timestamp) -> Result<(), LaneError> {
        for (index, lane) in self.pending_lanes.iter() {
            match self.expiration_times[index] {
                None => {
                    self.expiration_times[index] = Some(self.config.expiration_time(lane, now)?);
                }
                Some(expiration) if expiration <= now => {
                    self.expired_lanes |= lane;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Pick the lanes the next render should work on.
    ///
    /// `wip_lanes` are the lanes of a render already in progress, or
    /// [`Lanes::NONE`]. An in-progress render is kept unless the new selection is
    /// strictly higher priority.
    pub fn get_next_lanes(&self, wip_lanes: Lanes) -> Result<Lanes, LaneError> {
        let pending = self.pending_lanes;
        if pending.is_empty() {
            return Ok(Lanes::NONE);
        }

        let non_idle_pending = pending.intersect(Lanes::NON_IDLE);
        if non_idle_pending.is_empty() {
            return Err(LaneError::Unsupported(pending));
        }
        let next_lanes = highest_priority_lanes(non_idle_pending)?;

        if !wip_lanes.is_empty() && wip_lanes != next_lanes {
            let next_lane = next_lanes.highest_priority_lane();
            let wip_lane = wip_lanes.highest_priority_lane();
            if next_lane.bits() >= wip_lane.bits() {
                debug!(?wip_lanes, ?next_lanes, "keeping in-progress render");
                return Ok(wip_lanes);
            }
            debug!(?wip_lanes, ?next_lanes, "higher priority preempts in-progress render");
        }

        Ok(next_lanes)
    }
}
