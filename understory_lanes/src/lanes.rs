// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lane bitmasks: set arithmetic, priority picking, and per-lane maps.

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign, Index, IndexMut};

/// Number of usable lane positions.
pub const TOTAL_LANES: usize = 31;

/// Milliseconds on the host clock.
pub type Timestamp = u64;

/// A set of priority lanes.
///
/// Each set bit is one lane; a value with at most one bit set is a single [`Lane`].
/// Lower bit positions are higher priority, so bit 0 ([`Lanes::SYNC`]) always wins.
///
/// Only the low [`TOTAL_LANES`] bits are usable. Constructors mask off bit 31.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Lanes(u32);

/// A single lane. Same representation as [`Lanes`] with at most one bit set.
pub type Lane = Lanes;

impl Lanes {
    /// The empty set (also "no lane").
    pub const NONE: Self = Self(0);
    /// The synchronous lane: highest priority, expires first.
    pub const SYNC: Self = Self(0b1);
    /// Every lane that is not an idle lane.
    pub const NON_IDLE: Self = Self(0b000_1111_1111_1111_1111_1111_1111_1111);
    /// Every usable lane.
    pub const ALL: Self = Self(0x7FFF_FFFF);

    /// Build a lane set from raw bits. Bits outside the usable range are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// The single lane at bit position `index`, or [`Lanes::NONE`] if out of range.
    pub const fn from_index(index: usize) -> Lane {
        if index < TOTAL_LANES {
            Self(1 << index)
        } else {
            Self::NONE
        }
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if no lane is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Isolate the highest-priority (lowest) set bit.
    pub const fn highest_priority_lane(self) -> Lane {
        Self(self.0 & self.0.wrapping_neg())
    }

    /// True if every lane of `subset` is also in `self`.
    ///
    /// The empty set is a subset of everything, so an update carrying
    /// [`Lanes::NONE`] is eligible in any pass.
    pub const fn contains(self, subset: Self) -> bool {
        self.0 & subset.0 == subset.0
    }

    /// True if `self` and `other` share at least one lane.
    pub const fn includes_some(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Union.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove every lane of `other`.
    #[must_use]
    pub const fn remove(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Intersection.
    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Bit index of the highest set bit (the lowest-priority lane present).
    ///
    /// Which lane is picked does not matter to callers that loop until the set is
    /// empty; this one is cheap to compute from the leading-zero count.
    pub const fn pick_arbitrary_index(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some((31 - self.0.leading_zeros()) as usize)
        }
    }

    /// Iterate the set lanes as `(index, lane)` pairs, from the highest index down.
    pub fn iter(self) -> LaneIter {
        LaneIter { remaining: self }
    }
}

impl fmt::Debug for Lanes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lanes({:#b})", self.0)
    }
}

impl BitOr for Lanes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.merge(rhs)
    }
}

impl BitOrAssign for Lanes {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.merge(rhs);
    }
}

impl BitAnd for Lanes {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersect(rhs)
    }
}

/// Iterator over the lanes of a [`Lanes`] set, see [`Lanes::iter`].
#[derive(Clone, Debug)]
pub struct LaneIter {
    remaining: Lanes,
}

impl Iterator for LaneIter {
    type Item = (usize, Lane);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.remaining.pick_arbitrary_index()?;
        let lane = Lanes::from_index(index);
        self.remaining = self.remaining.remove(lane);
        Some((index, lane))
    }
}

/// A fixed array with one slot per lane position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneMap<T>([T; TOTAL_LANES]);

impl<T: Clone> LaneMap<T> {
    /// A map with every slot set to `initial`.
    pub fn filled(initial: T) -> Self {
        Self(core::array::from_fn(|_| initial.clone()))
    }
}

impl<T> LaneMap<T> {
    /// Slot for `lane`. For a multi-lane set this is the slot of its highest index.
    pub fn get(&self, lane: Lane) -> Option<&T> {
        lane.pick_arbitrary_index().map(|i| &self.0[i])
    }

    /// Mutable slot for `lane`, see [`LaneMap::get`].
    pub fn get_mut(&mut self, lane: Lane) -> Option<&mut T> {
        lane.pick_arbitrary_index().map(|i| &mut self.0[i])
    }

    /// Iterate all slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T> Index<usize> for LaneMap<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.0[index]
    }
}

impl<T> IndexMut<usize> for LaneMap<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.0[index]
    }
}
