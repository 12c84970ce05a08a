//! Core types for network-selection equilibrium analysis.
//!
//! A simulation run is a sequence of time slots. At each slot a population of
//! mobile devices is partitioned across `K` wireless networks, and each device
//! can reach some subset of the networks. These types describe that per-slot
//! state; the distance computation over it lives in `netsel-engine`.

mod accessibility;
mod equilibrium;
mod identifiers;
mod snapshot;

pub use accessibility::{AccessTable, Accessibility};
pub use equilibrium::{EquilibriumState, MoveRecord};
pub use identifiers::{DeviceId, NetworkId, RunId, TimeSlot};
pub use snapshot::{SlotSnapshot, SnapshotError};
