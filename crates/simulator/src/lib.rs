//! Network-selection simulator.
//!
//! Drives the distance engine over whole runs: a selection workload produces
//! one allocation per time slot, the engine scores each slot against the
//! scenario's admissible equilibria, and the per-slot distances are reduced
//! into tables and a summary report.
//!
//! # Architecture
//!
//! The simulator builds on `netsel-engine` and `netsel-scenario` to provide:
//!
//! - **Workload Generation**: uniform random selection, seeded per run
//! - **Trace Replay**: recorded `network.csv` selections re-evaluated offline
//! - **Aggregation**: per-slot and per-cycle reductions across runs
//! - **Reporting**: distance percentiles and epsilon-equilibrium counts
//!
//! # Example
//!
//! ```ignore
//! use netsel_scenario::Scenario;
//! use netsel_simulator::{Simulator, SimulatorConfig};
//!
//! // Ten runs of one simulated day with a fixed seed.
//! let scenario = Scenario::by_name("office_day")?;
//! let config = SimulatorConfig::new(scenario)
//!     .with_runs(10)
//!     .with_seed(7);
//!
//! let report = Simulator::new(config).run()?;
//! report.print();
//! ```

pub mod config;
pub mod error;
pub mod runner;
pub mod stats;
pub mod trace;
pub mod workload;

pub use config::SimulatorConfig;
pub use error::SimulatorError;
pub use runner::{SimulationReport, Simulator};
pub use trace::TraceError;
pub use workload::UniformSelection;
