// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::lanes::Lanes;

/// Errors from lane computations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LaneError {
    /// Only [`Lanes::SYNC`] has a defined priority and timeout; anything else
    /// lands here instead of guessing.
    #[error("no priority is defined for lanes {0:?}")]
    Unsupported(Lanes),
}
