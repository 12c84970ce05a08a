//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wireless network identifier (1-based, `1..=K` for a slot with K networks).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NetworkId(pub u32);

impl NetworkId {
    /// Position of this network in a `K`-length per-network vector.
    pub fn index(self) -> usize {
        debug_assert!(self.0 >= 1, "NetworkId is 1-based");
        (self.0 - 1) as usize
    }

    /// Identifier for the network stored at `index` in a per-network vector.
    pub fn from_index(index: usize) -> Self {
        NetworkId(index as u32 + 1)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mobile device identifier (1-based).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time slot index within a run (1-based).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeSlot(pub u64);

impl TimeSlot {
    /// First slot of a run.
    pub const FIRST: Self = TimeSlot(1);

    /// Get the next time slot.
    pub fn next(self) -> Self {
        TimeSlot(self.0 + 1)
    }

    /// Zero-based offset of this slot within a repeating cycle of
    /// `slots_per_cycle` slots.
    pub fn cycle_offset(self, slots_per_cycle: u64) -> u64 {
        debug_assert!(self.0 >= 1, "TimeSlot is 1-based");
        debug_assert!(slots_per_cycle >= 1);
        (self.0 - 1) % slots_per_cycle
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulation run (trial) index (1-based).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RunId(pub u32);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
