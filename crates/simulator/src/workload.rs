//! Synthetic selection workloads.

use indexmap::IndexSet;
use netsel_scenario::Scenario;
use netsel_types::{Accessibility, SlotSnapshot, SnapshotError, TimeSlot};
use rand::Rng;

/// Uniform random network selection.
///
/// Every slot, each device independently picks one of its accessible networks
/// uniformly at random. A device with no coverage in the current phase sits
/// the slot out. There is no learning and no weighting; the workload models
/// the naive baseline the distance report is usually measured against.
#[derive(Debug, Clone, Copy)]
pub struct UniformSelection<'a> {
    scenario: &'a Scenario,
}

impl<'a> UniformSelection<'a> {
    pub fn new(scenario: &'a Scenario) -> Self {
        Self { scenario }
    }

    /// Draw one allocation for `slot`.
    pub fn snapshot(
        &self,
        slot: TimeSlot,
        rng: &mut impl Rng,
    ) -> Result<SlotSnapshot, SnapshotError> {
        let num_networks = self.scenario.num_networks();
        let mut members = vec![IndexSet::new(); num_networks];
        for device in self.scenario.devices() {
            let reachable = self
                .scenario
                .accessible_networks(slot, device, num_networks);
            if reachable.is_empty() {
                continue;
            }
            let pick = reachable[rng.gen_range(0..reachable.len())];
            members[pick.index()].insert(device);
        }
        SlotSnapshot::new(slot, self.scenario.rates(slot).to_vec(), members)
    }
}
