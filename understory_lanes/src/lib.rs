// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_lanes --heading-base-level=0

//! Understory Lanes: bitmask priority lanes for incremental rendering.
//!
//! A [`Lanes`] value is a 31-bit set of independent priority channels. Lower bits
//! are higher priority; bit 0 is [`Lanes::SYNC`], the always-available lane that
//! expires first.
//!
//! [`RootLanes`] is the per-application record of which lanes have pending or
//! expired work, with an expiration time and an event time per lane position.
//!
//! - [`Lanes::highest_priority_lane`], [`Lanes::contains`], [`Lanes::merge`],
//!   [`Lanes::remove`], and [`Lanes::pick_arbitrary_index`] are pure bit arithmetic.
//! - [`RootLanes::mark_starved_lanes_as_expired`] assigns timeouts and promotes
//!   lanes that waited too long.
//! - [`RootLanes::get_next_lanes`] picks the lanes for the next render without ever
//!   downgrading a render already in progress.
//!
//! ## Priority table
//!
//! Only the synchronous lane has a defined priority group and timeout.
//! Computations that would need a priority for any other lane return
//! [`LaneError::Unsupported`] rather than inventing one. Pure set arithmetic works
//! for every lane.
//!
//! # Example
//!
//! ```rust
//! use understory_lanes::{Lanes, RootLanes};
//!
//! let mut root = RootLanes::new();
//! root.mark_root_updated(Lanes::SYNC, 0);
//!
//! // Assign a timeout, then let it pass.
//! root.mark_starved_lanes_as_expired(0).unwrap();
//! root.mark_starved_lanes_as_expired(1_000).unwrap();
//! assert_eq!(root.expired_lanes(), Lanes::SYNC);
//!
//! assert_eq!(root.get_next_lanes(Lanes::NONE).unwrap(), Lanes::SYNC);
//!
//! // Commit with nothing left over.
//! root.mark_root_finished(Lanes::NONE);
//! assert!(root.pending_lanes().is_empty());
//! ```
//!
//! This crate is `no_std` and uses `alloc` only in tests.

#![no_std]

#[cfg(test)]
extern crate alloc;

mod error;
mod lanes;
mod root;

pub use error::LaneError;
pub use lanes::{Lane, LaneIter, LaneMap, Lanes, TOTAL_LANES, Timestamp};
pub use root::{RootConfig, RootLanes, highest_priority_lanes};
