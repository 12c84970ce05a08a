//! The distance-to-equilibrium computation.
//!
//! One evaluation answers a single question about one slot: how much better
//! off could any device still be? The answer is obtained constructively. The
//! engine picks the cheapest admissible equilibrium, then simulates the device
//! moves that would morph the observed allocation into it, walking transfer
//! paths of increasing length until every network holds exactly its target
//! count. Every simulated move compares the bandwidth share the device holds
//! now with the share it would hold at the target, and the reported distance
//! is the maximum such improvement seen, including the improvement of devices
//! left behind on networks that finished shedding their surplus.
//!
//! Counts in the gain formulas always come from the unmodified snapshot. The
//! simulation mutates only the transfer graph and the per-network deficits;
//! the gain a device "currently" observes is what it observed before any
//! simulated move happened.

use indexmap::IndexSet;
use netsel_types::{
    Accessibility, DeviceId, EquilibriumState, MoveRecord, NetworkId, SlotSnapshot, TimeSlot,
};
use tracing::{debug, trace};

use crate::equilibrium::EquilibriumCatalog;
use crate::error::EngineError;
use crate::graph::TransferGraph;

/// How a device's potential improvement is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMode {
    /// Improvement as a percentage of the device's current bandwidth share.
    /// A device with no current share (stale assignment, or an originally
    /// empty source network) is scored against a zero baseline and reports
    /// the full 100 percent.
    #[default]
    Percentage,
    /// Improvement in raw bandwidth units.
    Absolute,
}

/// Tunables for a [`DistanceEngine`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    mode: DistanceMode,
    device_filter: Option<IndexSet<DeviceId>>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: DistanceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Report the distance observed by these devices only. Moves are still
    /// simulated for the whole population; the filter restricts which gain
    /// deltas fold into the reported maximum.
    pub fn with_device_filter(mut self, devices: impl IntoIterator<Item = DeviceId>) -> Self {
        self.device_filter = Some(devices.into_iter().collect());
        self
    }

    pub fn mode(&self) -> DistanceMode {
        self.mode
    }
}

/// Outcome of one slot evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceReport {
    /// Worst-case gain over all devices touched by the resolution.
    pub distance: f64,
    /// Simulated moves, in the order they were applied.
    pub moves: Vec<MoveRecord>,
    /// Index into the candidate list of the equilibrium that was targeted.
    pub target_index: usize,
}

/// Computes the per-slot distance to the nearest admissible equilibrium.
///
/// The engine is stateless between calls; each evaluation builds and discards
/// its own scratch structures, so one engine may be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct DistanceEngine {
    config: EngineConfig,
}

impl DistanceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Evaluate one slot.
    ///
    /// `snapshot` is the observed allocation, `candidates` the admissible
    /// equilibrium states for the slot, and `access` the accessibility model
    /// queried at the snapshot's slot.
    pub fn evaluate<A: Accessibility>(
        &self,
        snapshot: &SlotSnapshot,
        candidates: &[EquilibriumState],
        access: &A,
    ) -> Result<DistanceReport, EngineError> {
        let slot = snapshot.slot();
        validate(slot, snapshot, candidates, access)?;

        let counts = snapshot.counts();
        let catalog = EquilibriumCatalog::new(candidates);
        if let Some(target_index) = catalog.matching(&counts) {
            debug!(%slot, target = %candidates[target_index], "allocation already at equilibrium");
            return Ok(DistanceReport {
                distance: 0.0,
                moves: Vec::new(),
                target_index,
            });
        }

        let target_index = catalog
            .select_best_target(&counts)
            .ok_or_else(|| EngineError::configuration(slot, "no admissible equilibrium states"))?;
        let target = &candidates[target_index];
        debug!(
            %slot,
            %target,
            move_cost = EquilibriumCatalog::move_cost(target, &counts),
            "selected equilibrium target"
        );

        let deficit: Vec<i64> = target
            .0
            .iter()
            .zip(counts.iter())
            .map(|(&want, &have)| i64::from(want) - i64::from(have))
            .collect();

        let resolution = Resolution {
            slot,
            mode: self.config.mode,
            filter: self.config.device_filter.as_ref(),
            snapshot,
            counts: &counts,
            target,
            access,
            graph: TransferGraph::build(snapshot, access),
            order: accessibility_order(snapshot, access),
            deficit,
            distance: 0.0,
            moves: Vec::new(),
        };
        let (distance, moves) = resolution.run()?;
        Ok(DistanceReport {
            distance,
            moves,
            target_index,
        })
    }
}

/// Reject inputs the resolution cannot make sense of.
fn validate<A: Accessibility>(
    slot: TimeSlot,
    snapshot: &SlotSnapshot,
    candidates: &[EquilibriumState],
    access: &A,
) -> Result<(), EngineError> {
    let num_networks = snapshot.num_networks();
    if num_networks == 0 {
        return Err(EngineError::configuration(slot, "snapshot covers no networks"));
    }
    if candidates.is_empty() {
        return Err(EngineError::configuration(
            slot,
            "no admissible equilibrium states",
        ));
    }
    let num_devices = snapshot.num_devices() as u64;
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.num_networks() != num_networks {
            return Err(EngineError::configuration(
                slot,
                format!(
                    "equilibrium candidate {index} covers {} networks, snapshot has {num_networks}",
                    candidate.num_networks()
                ),
            ));
        }
        if candidate.total_devices() != num_devices {
            return Err(EngineError::configuration(
                slot,
                format!(
                    "equilibrium candidate {index} places {} devices, snapshot has {num_devices}",
                    candidate.total_devices()
                ),
            ));
        }
    }
    for device in snapshot.devices() {
        let reachable = (0..num_networks)
            .map(NetworkId::from_index)
            .any(|network| access.can_access(slot, device, network));
        if !reachable {
            return Err(EngineError::configuration(
                slot,
                format!("device {device} is assigned but can access no network"),
            ));
        }
    }
    Ok(())
}

/// Networks ordered by ascending accessibility rank: the number of distinct
/// devices that can reach the network, ties broken by ascending id. The least
/// accessible networks are drained first since they have the fewest outlets.
fn accessibility_order<A: Accessibility>(snapshot: &SlotSnapshot, access: &A) -> Vec<NetworkId> {
    let slot = snapshot.slot();
    let devices: Vec<DeviceId> = snapshot.devices().collect();
    let mut ranked: Vec<(usize, NetworkId)> = snapshot
        .network_ids()
        .map(|network| {
            let rank = devices
                .iter()
                .filter(|&&device| access.can_access(slot, device, network))
                .count();
            (rank, network)
        })
        .collect();
    ranked.sort_by_key(|&(rank, network)| (rank, network));
    ranked.into_iter().map(|(_, network)| network).collect()
}

/// Scratch state for one slot's deficit resolution.
struct Resolution<'a, A> {
    slot: TimeSlot,
    mode: DistanceMode,
    filter: Option<&'a IndexSet<DeviceId>>,
    snapshot: &'a SlotSnapshot,
    /// Observed per-network counts; gain baselines read these, never the
    /// mutated graph.
    counts: &'a [u32],
    target: &'a EquilibriumState,
    access: &'a A,
    graph: TransferGraph,
    /// Networks in ascending accessibility rank, the processing order for
    /// both sources and destinations.
    order: Vec<NetworkId>,
    /// `target - observed` per network: negative is surplus to shed,
    /// positive is shortfall to fill. Sums to zero throughout.
    deficit: Vec<i64>,
    distance: f64,
    moves: Vec<MoveRecord>,
}

impl<A: Accessibility> Resolution<'_, A> {
    /// Drive path lengths `1..K-1`, cycling until every deficit is zero.
    ///
    /// Cycling back to short paths matters: a move can create edges that make
    /// a previously unreachable destination reachable. A full cycle that
    /// resolves nothing, or more cycles than there are networks, means the
    /// remaining deficits cannot be resolved under the accessibility model.
    fn run(mut self) -> Result<(f64, Vec<MoveRecord>), EngineError> {
        let num_networks = self.snapshot.num_networks();
        let mut cycles = 0u32;
        while self.unresolved() {
            let moves_before = self.moves.len();
            for path_length in 1..num_networks {
                self.pass(path_length)?;
                if !self.unresolved() {
                    break;
                }
            }
            cycles += 1;
            if self.unresolved()
                && (self.moves.len() == moves_before || cycles >= num_networks as u32)
            {
                return Err(EngineError::Convergence {
                    slot: self.slot,
                    cycles,
                });
            }
        }
        debug!(
            slot = %self.slot,
            distance = self.distance,
            moves = self.moves.len(),
            cycles,
            "deficits resolved"
        );
        Ok((self.distance, self.moves))
    }

    fn unresolved(&self) -> bool {
        self.deficit.iter().any(|&d| d > 0)
    }

    /// One sweep over all (source, destination) pairs at a fixed path length.
    fn pass(&mut self, path_length: usize) -> Result<(), EngineError> {
        for i in 0..self.order.len() {
            let source = self.order[i];
            if self.deficit[source.index()] >= 0 {
                continue;
            }
            for j in 0..self.order.len() {
                let dest = self.order[j];
                if self.deficit[dest.index()] <= 0 {
                    continue;
                }
                let Some(path) = self.graph.shortest_path(source, dest) else {
                    continue;
                };
                if path.len() != path_length + 1 {
                    continue;
                }
                let surplus = self.deficit[source.index()].unsigned_abs();
                let shortfall = self.deficit[dest.index()].unsigned_abs();
                let moved = self.transfer_along(&path, surplus.min(shortfall))?;
                self.deficit[source.index()] += moved as i64;
                self.deficit[dest.index()] -= moved as i64;
                debug_assert_eq!(self.deficit.iter().sum::<i64>(), 0);
                if self.deficit[source.index()] == 0 {
                    self.evaluate_leftover(source);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Move as many devices as possible along `path`, up to `limit`.
    ///
    /// The count is additionally bounded by the thinnest edge on the path.
    /// Devices cross the path hop by hop; a device arriving at an
    /// intermediate network becomes available for the next hop when its
    /// accessibility allows, which is what lets population flow through
    /// networks none of the shed devices could stay at.
    fn transfer_along(&mut self, path: &[NetworkId], limit: u64) -> Result<u64, EngineError> {
        let thinnest = path
            .windows(2)
            .map(|hop| self.graph.edge_device_count(hop[0], hop[1]) as u64)
            .min()
            .unwrap_or(0);
        let moved = limit.min(thinnest);
        trace!(
            from = %path[0],
            to = %path[path.len() - 1],
            hops = path.len() - 1,
            moved,
            "transferring along path"
        );
        for hop in path.windows(2) {
            for _ in 0..moved {
                self.move_one(hop[0], hop[1])?;
            }
        }
        Ok(moved)
    }

    /// Apply one device move across a single edge and fold its gain delta.
    fn move_one(&mut self, from: NetworkId, to: NetworkId) -> Result<(), EngineError> {
        let Some(device) = self.pick_device(from, to) else {
            return Err(EngineError::configuration(
                self.slot,
                format!("no transferable device left on edge {from} -> {to}"),
            ));
        };
        let observed_gain = self.current_gain(device, from);
        self.graph.move_device(from, to, device, self.access)?;
        self.moves.push(MoveRecord {
            device,
            from,
            to,
            observed_gain,
        });
        if let Some(target_gain) = self.target_gain(to) {
            let delta = self.delta(observed_gain, target_gain);
            self.fold(device, delta);
        }
        trace!(%device, %from, %to, observed_gain, "moved device");
        Ok(())
    }

    /// Next device to take off the edge. Devices that cannot access the
    /// network they are leaving have nothing to lose and go first; otherwise
    /// the earliest device on the edge is taken.
    fn pick_device(&self, from: NetworkId, to: NetworkId) -> Option<DeviceId> {
        let mut fallback = None;
        for device in self.graph.edge_devices(from, to) {
            if !self.access.can_access(self.slot, device, from) {
                return Some(device);
            }
            if fallback.is_none() {
                fallback = Some(device);
            }
        }
        fallback
    }

    /// Bandwidth share `device` observes at `network` in the snapshot.
    /// Zero when the device has no access to the network, or when the
    /// network held no devices at the start of the slot.
    fn current_gain(&self, device: DeviceId, network: NetworkId) -> f64 {
        let count = self.counts[network.index()];
        if count == 0 || !self.access.can_access(self.slot, device, network) {
            return 0.0;
        }
        self.snapshot.rate(network) / f64::from(count)
    }

    /// Bandwidth share a device would observe at `network` at the target
    /// equilibrium, or `None` if the target places nobody there.
    fn target_gain(&self, network: NetworkId) -> Option<f64> {
        let count = self.target.count(network);
        (count > 0).then(|| self.snapshot.rate(network) / f64::from(count))
    }

    fn delta(&self, current: f64, target: f64) -> f64 {
        match self.mode {
            DistanceMode::Percentage => {
                if current > 0.0 {
                    100.0 * (target - current) / current
                } else {
                    // Zero baseline: the device currently gets nothing, so
                    // any positive share is the full improvement.
                    100.0
                }
            }
            DistanceMode::Absolute => target - current,
        }
    }

    fn fold(&mut self, device: DeviceId, delta: f64) {
        if self
            .filter
            .is_some_and(|devices| !devices.contains(&device))
        {
            return;
        }
        if delta > self.distance {
            self.distance = delta;
        }
    }

    /// Score the devices still at a source network that just finished
    /// shedding its surplus: at equilibrium they would share the network's
    /// rate among the target count instead of the observed count.
    fn evaluate_leftover(&mut self, network: NetworkId) {
        let Some(would_be) = self.target_gain(network) else {
            return;
        };
        let residents: Vec<DeviceId> = self.graph.residents(network).collect();
        for device in residents {
            let current = self.current_gain(device, network);
            let delta = self.delta(current, would_be);
            self.fold(device, delta);
        }
    }
}
