//! Nash-equilibrium distance engine.
//!
//! Given one slot's snapshot (device partition and per-network data rates),
//! the accessibility relation for that slot, and the admissible equilibrium
//! states, this crate computes a single scalar: the worst-case percentage
//! bandwidth gain any device could still obtain by switching networks. Zero
//! means the observed allocation already is an equilibrium.
//!
//! # Architecture
//!
//! ```text
//!   SlotSnapshot ──┐
//!   candidates ────┤                     ┌──> EquilibriumCatalog
//!   Accessibility ─┴──> DistanceEngine ──┤       (target selection)
//!                           │            └──> TransferGraph
//!                           ▼                    (move simulation)
//!                    DistanceReport
//! ```
//!
//! Each evaluation builds its own [`TransferGraph`] and discards it, so a
//! [`DistanceEngine`] can be shared freely across threads evaluating
//! independent slots.

mod distance;
mod equilibrium;
mod error;
mod graph;

pub use distance::{DistanceEngine, DistanceMode, DistanceReport, EngineConfig};
pub use equilibrium::EquilibriumCatalog;
pub use error::EngineError;
pub use graph::TransferGraph;
