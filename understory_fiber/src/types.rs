// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the fiber tree: identifiers, work tags, and flag sets.

/// Identifier for a fiber in the tree.
///
/// A small, copyable handle made of a slot index and a generation counter.
/// It stays stable while the fiber is mounted and becomes stale once the fiber is
/// removed.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `FiberId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `FiberId`.
///
/// The two sides of a tree position (current and work-in-progress) have distinct
/// ids. Use [`FiberTree::alternate`](crate::FiberTree::alternate) to go from one to
/// the other.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FiberId(pub(crate) u32, pub(crate) u32);

impl FiberId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// The kind of work a fiber performs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WorkTag {
    /// The root of an application's tree.
    HostRoot,
    /// A plain stateful function component.
    FunctionComponent,
}

bitflags::bitflags! {
    /// Pending mutations recorded on a fiber for the commit phase.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FiberFlags: u32 {
        /// Newly inserted; the host must place it.
        const PLACEMENT      = 0b0000_0000_0010;
        /// Has layout effects to run after mutation.
        const UPDATE         = 0b0000_0000_0100;
        /// One or more children were removed.
        const CHILD_DELETION = 0b0000_0001_0000;
        /// Has passive effects to run after commit.
        const PASSIVE        = 0b0100_0000_0000;
    }
}

bitflags::bitflags! {
    /// Tag of a single effect record.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HookEffectTags: u8 {
        /// The effect must run (its dependencies changed or it is new).
        const HAS_EFFECT = 0b0001;
        /// Registered with `use_layout_effect`.
        const LAYOUT     = 0b0100;
        /// Registered with `use_effect`.
        const PASSIVE    = 0b1000;
    }
}
