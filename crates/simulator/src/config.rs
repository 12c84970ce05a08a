//! Configuration types for the simulator.

use indexmap::IndexSet;
use netsel_engine::{DistanceMode, EngineConfig};
use netsel_scenario::Scenario;
use netsel_types::DeviceId;
use std::path::PathBuf;

/// Configuration for a batch of simulation runs.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// The scenario being simulated.
    pub scenario: Scenario,

    /// Number of independent runs.
    pub runs: u32,

    /// Number of time slots evaluated per run.
    pub slots: u64,

    /// Base random seed; run `r` draws from `seed + r`.
    pub seed: u64,

    /// Distance at or below which a slot counts as at equilibrium.
    pub epsilon: f64,

    /// How movement gains are measured.
    pub mode: DistanceMode,

    /// Directory for distance tables; `None` keeps results in memory.
    pub output: Option<PathBuf>,

    /// Restrict distance accounting to these devices.
    pub device_filter: Option<IndexSet<DeviceId>>,

    /// Evaluate runs on the rayon thread pool.
    pub parallel: bool,
}

impl SimulatorConfig {
    /// Create a configuration covering one scenario cycle per run.
    pub fn new(scenario: Scenario) -> Self {
        let slots = scenario.slots_per_cycle();
        Self {
            scenario,
            runs: 5,
            slots,
            seed: 12345,
            epsilon: 7.5,
            mode: DistanceMode::default(),
            output: None,
            device_filter: None,
            parallel: false,
        }
    }

    /// Set the number of runs.
    pub fn with_runs(mut self, runs: u32) -> Self {
        self.runs = runs;
        self
    }

    /// Set the number of slots per run.
    pub fn with_slots(mut self, slots: u64) -> Self {
        self.slots = slots;
        self
    }

    /// Set the base random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the equilibrium threshold.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the distance mode.
    pub fn with_mode(mut self, mode: DistanceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the output directory for distance tables.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Restrict distance accounting to the given devices.
    pub fn with_device_filter(mut self, devices: impl IntoIterator<Item = DeviceId>) -> Self {
        self.device_filter = Some(devices.into_iter().collect());
        self
    }

    /// Evaluate runs in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Engine configuration implied by the mode and device filter.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new().with_mode(self.mode);
        if let Some(devices) = &self.device_filter {
            config = config.with_device_filter(devices.iter().copied());
        }
        config
    }
}
