//! Scenario definitions for network-selection simulations.
//!
//! A scenario stands in for the wireless environment: it fixes, per time
//! slot, the data rate each network offers, which devices can reach which
//! network, and the admissible equilibrium allocations. Scenarios are phased
//! over a repeating cycle (a "day") and are either built in
//! ([`Scenario::by_name`]) or loaded from TOML files ([`Scenario::load`]).

mod builtin;
mod definition;
mod error;

pub use definition::{Phase, Scenario};
pub use error::ScenarioError;
