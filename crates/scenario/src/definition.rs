//! Phased scenario definitions.
//!
//! A scenario describes a repeating cycle of time slots partitioned into
//! phases. Each phase fixes the per-network data rates, the access table and
//! the admissible equilibrium allocations until the next phase begins; runs
//! longer than one cycle wrap around to the first phase.

use netsel_types::{AccessTable, Accessibility, DeviceId, EquilibriumState, NetworkId, TimeSlot};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ScenarioError;

/// One window of a scenario's cycle with fixed rates and coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Zero-based cycle offset (in slots) at which the phase takes effect.
    pub start: u64,

    /// Data rate per network while the phase is active.
    pub rates: Vec<f64>,

    /// Devices able to reach each network.
    pub access: AccessTable,

    /// Admissible equilibrium allocations for the phase.
    pub equilibria: Vec<EquilibriumState>,
}

/// A named, validated scenario: device population, cycle length and phases.
///
/// Built through [`Scenario::new`] or the TOML loaders, which validate the
/// definition up front. Accessors rely on that validation, in particular on
/// the phase list being non-empty, sorted and starting at offset 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    name: String,
    num_devices: u32,
    slots_per_cycle: u64,
    phases: Vec<Phase>,
}

/// Unvalidated mirror of [`Scenario`] for TOML parsing.
#[derive(Deserialize)]
struct RawScenario {
    name: String,
    num_devices: u32,
    slots_per_cycle: u64,
    phases: Vec<Phase>,
}

impl Scenario {
    /// Build a scenario, rejecting structurally invalid definitions.
    pub fn new(
        name: impl Into<String>,
        num_devices: u32,
        slots_per_cycle: u64,
        phases: Vec<Phase>,
    ) -> Result<Self, ScenarioError> {
        let scenario = Self {
            name: name.into(),
            num_devices,
            slots_per_cycle,
            phases,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse and validate a scenario from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, ScenarioError> {
        let raw: RawScenario = toml::from_str(raw)?;
        Scenario::new(raw.name, raw.num_devices, raw.slots_per_cycle, raw.phases)
    }

    /// Load a scenario from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Resolve a built-in scenario by name.
    pub fn by_name(name: &str) -> Result<Self, ScenarioError> {
        crate::builtin::by_name(name)
    }

    /// Names of the built-in scenarios.
    pub fn builtin_names() -> &'static [&'static str] {
        crate::builtin::NAMES
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Devices participating in the scenario, identified `1..=num_devices`.
    pub fn num_devices(&self) -> u32 {
        self.num_devices
    }

    /// Length of the repeating cycle, in slots.
    pub fn slots_per_cycle(&self) -> u64 {
        self.slots_per_cycle
    }

    /// Number of networks, uniform across phases.
    pub fn num_networks(&self) -> usize {
        self.phases[0].rates.len()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// All device ids in ascending order.
    pub fn devices(&self) -> impl Iterator<Item = DeviceId> {
        (1..=self.num_devices).map(DeviceId)
    }

    /// The phase governing `slot`: the one with the greatest start offset at
    /// or before the slot's position in the cycle.
    pub fn phase(&self, slot: TimeSlot) -> &Phase {
        let offset = slot.cycle_offset(self.slots_per_cycle);
        // Phases are sorted by start and the first starts at offset 0.
        let mut current = &self.phases[0];
        for phase in &self.phases[1..] {
            if phase.start <= offset {
                current = phase;
            }
        }
        current
    }

    /// Per-network data rates at `slot`.
    pub fn rates(&self, slot: TimeSlot) -> &[f64] {
        &self.phase(slot).rates
    }

    /// Admissible equilibrium states at `slot`.
    pub fn equilibria(&self, slot: TimeSlot) -> &[EquilibriumState] {
        &self.phase(slot).equilibria
    }

    /// Whether `slot` is the first slot of a phase within its cycle.
    pub fn phase_boundary(&self, slot: TimeSlot) -> bool {
        let offset = slot.cycle_offset(self.slots_per_cycle);
        self.phases.iter().any(|phase| phase.start == offset)
    }

    fn invalid(&self, reason: impl Into<String>) -> ScenarioError {
        ScenarioError::Invalid {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.num_devices == 0 {
            return Err(self.invalid("no devices"));
        }
        if self.slots_per_cycle == 0 {
            return Err(self.invalid("slots_per_cycle must be at least 1"));
        }
        let Some(first) = self.phases.first() else {
            return Err(self.invalid("no phases defined"));
        };
        if first.start != 0 {
            return Err(self.invalid(format!(
                "first phase starts at offset {}, expected 0",
                first.start
            )));
        }
        for pair in self.phases.windows(2) {
            if pair[1].start <= pair[0].start {
                return Err(self.invalid(format!(
                    "phase starts must be strictly increasing, offset {} follows {}",
                    pair[1].start, pair[0].start
                )));
            }
        }
        let num_networks = first.rates.len();
        if num_networks == 0 {
            return Err(self.invalid("no networks defined"));
        }
        for phase in &self.phases {
            if phase.start >= self.slots_per_cycle {
                return Err(self.invalid(format!(
                    "phase at offset {} starts beyond the {}-slot cycle",
                    phase.start, self.slots_per_cycle
                )));
            }
            if phase.rates.len() != num_networks {
                return Err(self.invalid(format!(
                    "phase at offset {} covers {} networks, expected {}",
                    phase.start,
                    phase.rates.len(),
                    num_networks
                )));
            }
            for (index, rate) in phase.rates.iter().enumerate() {
                if !rate.is_finite() || *rate <= 0.0 {
                    return Err(self.invalid(format!(
                        "network {} has non-positive rate {} in phase at offset {}",
                        NetworkId::from_index(index),
                        rate,
                        phase.start
                    )));
                }
            }
            if phase.access.num_networks() != num_networks {
                return Err(self.invalid(format!(
                    "phase at offset {} has access entries for {} networks, expected {}",
                    phase.start,
                    phase.access.num_networks(),
                    num_networks
                )));
            }
            for index in 0..num_networks {
                let network = NetworkId::from_index(index);
                let Some(allowed) = phase.access.allowed(network) else {
                    continue;
                };
                for device in allowed {
                    if device.0 == 0 || device.0 > self.num_devices {
                        return Err(self.invalid(format!(
                            "phase at offset {} grants network {network} access to unknown device {device}",
                            phase.start
                        )));
                    }
                }
            }
            if phase.equilibria.is_empty() {
                return Err(self.invalid(format!(
                    "phase at offset {} has no equilibrium states",
                    phase.start
                )));
            }
            for state in &phase.equilibria {
                if state.num_networks() != num_networks {
                    return Err(self.invalid(format!(
                        "equilibrium {state} in phase at offset {} covers {} networks, expected {}",
                        phase.start,
                        state.num_networks(),
                        num_networks
                    )));
                }
                if state.total_devices() != u64::from(self.num_devices) {
                    return Err(self.invalid(format!(
                        "equilibrium {state} in phase at offset {} allocates {} devices, expected {}",
                        phase.start,
                        state.total_devices(),
                        self.num_devices
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Accessibility for Scenario {
    fn can_access(&self, slot: TimeSlot, device: DeviceId, network: NetworkId) -> bool {
        self.phase(slot).access.can_access(slot, device, network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;

    const RAW: &str = r#"
        name = "toml_test"
        num_devices = 4
        slots_per_cycle = 100

        [[phases]]
        start = 0
        rates = [10.0, 20.0]
        access = [[1, 2, 3, 4], [1, 2, 3, 4]]
        equilibria = [[1, 3]]

        [[phases]]
        start = 50
        rates = [20.0, 10.0]
        access = [[1, 2, 3, 4], [3, 4]]
        equilibria = [[3, 1], [2, 2]]
    "#;

    fn devices(ids: impl IntoIterator<Item = u32>) -> IndexSet<DeviceId> {
        ids.into_iter().map(DeviceId).collect()
    }

    fn make_phase(start: u64) -> Phase {
        Phase {
            start,
            rates: vec![10.0, 20.0],
            access: AccessTable::new(vec![devices(1..=4), devices(1..=4)]),
            equilibria: vec![EquilibriumState(vec![1, 3])],
        }
    }

    fn make_scenario(phases: Vec<Phase>) -> Result<Scenario, ScenarioError> {
        Scenario::new("test", 4, 100, phases)
    }

    fn assert_invalid(result: Result<Scenario, ScenarioError>, needle: &str) {
        match result {
            Err(ScenarioError::Invalid { reason, .. }) => {
                assert!(reason.contains(needle), "unexpected reason: {reason}");
            }
            other => panic!("expected invalid scenario, got {other:?}"),
        }
    }

    #[test]
    fn test_phase_lookup_follows_cycle_offset() {
        let scenario = make_scenario(vec![make_phase(0), make_phase(50)]).unwrap();
        assert_eq!(scenario.phase(TimeSlot(1)).start, 0);
        assert_eq!(scenario.phase(TimeSlot(50)).start, 0);
        assert_eq!(scenario.phase(TimeSlot(51)).start, 50);
        assert_eq!(scenario.phase(TimeSlot(100)).start, 50);
        // The second cycle wraps back to the first phase.
        assert_eq!(scenario.phase(TimeSlot(101)).start, 0);
        assert_eq!(scenario.phase(TimeSlot(151)).start, 50);
    }

    #[test]
    fn test_phase_boundary_detection() {
        let scenario = make_scenario(vec![make_phase(0), make_phase(50)]).unwrap();
        assert!(scenario.phase_boundary(TimeSlot(1)));
        assert!(!scenario.phase_boundary(TimeSlot(2)));
        assert!(scenario.phase_boundary(TimeSlot(51)));
        assert!(scenario.phase_boundary(TimeSlot(101)));
        assert!(!scenario.phase_boundary(TimeSlot(100)));
    }

    #[test]
    fn test_device_iteration() {
        let scenario = make_scenario(vec![make_phase(0)]).unwrap();
        let devices: Vec<DeviceId> = scenario.devices().collect();
        assert_eq!(
            devices,
            vec![DeviceId(1), DeviceId(2), DeviceId(3), DeviceId(4)]
        );
    }

    #[test]
    fn test_rejects_empty_phase_list() {
        assert_invalid(make_scenario(vec![]), "no phases");
    }

    #[test]
    fn test_rejects_first_phase_not_at_zero() {
        assert_invalid(make_scenario(vec![make_phase(10)]), "expected 0");
    }

    #[test]
    fn test_rejects_unordered_phases() {
        assert_invalid(
            make_scenario(vec![make_phase(0), make_phase(60), make_phase(60)]),
            "strictly increasing",
        );
    }

    #[test]
    fn test_rejects_phase_beyond_cycle() {
        assert_invalid(
            make_scenario(vec![make_phase(0), make_phase(100)]),
            "beyond the 100-slot cycle",
        );
    }

    #[test]
    fn test_rejects_mismatched_network_count() {
        let mut narrow = make_phase(50);
        narrow.rates = vec![10.0];
        assert_invalid(
            make_scenario(vec![make_phase(0), narrow]),
            "covers 1 networks",
        );
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let mut bad = make_phase(0);
        bad.rates[1] = 0.0;
        assert_invalid(make_scenario(vec![bad]), "non-positive rate");
    }

    #[test]
    fn test_rejects_unknown_device_in_access_table() {
        let mut bad = make_phase(0);
        bad.access = AccessTable::new(vec![devices(1..=4), devices([2, 9])]);
        assert_invalid(make_scenario(vec![bad]), "unknown device 9");
    }

    #[test]
    fn test_rejects_equilibrium_with_wrong_total() {
        let mut bad = make_phase(0);
        bad.equilibria = vec![EquilibriumState(vec![2, 3])];
        assert_invalid(make_scenario(vec![bad]), "allocates 5 devices");
    }

    #[test]
    fn test_rejects_equilibrium_with_wrong_shape() {
        let mut bad = make_phase(0);
        bad.equilibria = vec![EquilibriumState(vec![4])];
        assert_invalid(make_scenario(vec![bad]), "covers 1 networks");
    }

    #[test]
    fn test_from_toml_str() {
        let scenario = Scenario::from_toml_str(RAW).unwrap();
        assert_eq!(scenario.name(), "toml_test");
        assert_eq!(scenario.num_devices(), 4);
        assert_eq!(scenario.num_networks(), 2);
        assert_eq!(scenario.phases().len(), 2);
        assert_eq!(scenario.rates(TimeSlot(1)), &[10.0, 20.0]);
        assert_eq!(
            scenario.equilibria(TimeSlot(51)),
            &[EquilibriumState(vec![3, 1]), EquilibriumState(vec![2, 2])][..]
        );
        assert!(scenario.can_access(TimeSlot(51), DeviceId(4), NetworkId(2)));
        assert!(!scenario.can_access(TimeSlot(51), DeviceId(1), NetworkId(2)));
    }

    #[test]
    fn test_from_toml_str_rejects_bad_shape() {
        let result = Scenario::from_toml_str("name = 3");
        assert!(matches!(result, Err(ScenarioError::Parse(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let scenario = make_scenario(vec![make_phase(0), make_phase(50)]).unwrap();
        let raw = toml::to_string(&scenario).unwrap();
        let parsed = Scenario::from_toml_str(&raw).unwrap();
        assert_eq!(parsed, scenario);
    }

    #[test]
    fn test_load_reads_scenario_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        std::fs::write(&path, RAW).unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.name(), "toml_test");

        let missing = Scenario::load(dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ScenarioError::Io(_))));
    }
}
