//! Per-slot transfer graph over networks.
//!
//! This module provides `TransferGraph`, a directed multigraph built from one
//! slot's snapshot. An edge `u -> v` carries the devices currently sitting at
//! `u` that are allowed onto `v`; a path through the graph is a chain of
//! single-device handovers that shifts one unit of population along it.
//!
//! The graph is a scratch structure: the engine builds one per evaluation,
//! replays candidate moves on it, and drops it. The underlying snapshot is
//! never modified.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use netsel_types::{Accessibility, DeviceId, NetworkId, SlotSnapshot, TimeSlot};

use crate::error::EngineError;

/// Directed multigraph of admissible single-hop transfers for one slot.
///
/// Both maps use insertion order as iteration order, which makes path search
/// and device picking deterministic for a given snapshot. Two invariants hold
/// between calls:
///
/// * every device set on an edge is non-empty (emptied edges are removed), and
/// * a device appears on an outgoing edge of `u` only while it resides at `u`.
pub struct TransferGraph {
    slot: TimeSlot,
    num_networks: usize,
    /// `edges[u][v]` = devices at `u` that can reach `v`.
    edges: IndexMap<NetworkId, IndexMap<NetworkId, IndexSet<DeviceId>>>,
    /// Where each device currently sits, tracked as moves are applied.
    residents: IndexMap<NetworkId, IndexSet<DeviceId>>,
}

impl TransferGraph {
    /// Build the graph for one snapshot under the given accessibility model.
    ///
    /// Every network gets a residents entry, including empty ones; edges exist
    /// only where at least one device can make the hop. Note that a device is
    /// linked onward from wherever the snapshot says it sits, even when it can
    /// no longer access that network itself (a stale assignment); such devices
    /// are exactly the ones a later move should prefer to clear out.
    pub fn build(snapshot: &SlotSnapshot, access: &impl Accessibility) -> Self {
        let mut graph = Self {
            slot: snapshot.slot(),
            num_networks: snapshot.num_networks(),
            edges: IndexMap::new(),
            residents: snapshot
                .network_ids()
                .map(|network| (network, snapshot.members(network).clone()))
                .collect(),
        };
        for network in snapshot.network_ids() {
            for device in snapshot.members(network).iter().copied() {
                graph.link_onward(network, device, access);
            }
        }
        graph
    }

    /// Insert `device` onto every edge out of `at` it is allowed to take.
    fn link_onward(&mut self, at: NetworkId, device: DeviceId, access: &impl Accessibility) {
        for target in (0..self.num_networks).map(NetworkId::from_index) {
            if target != at && access.can_access(self.slot, device, target) {
                self.edges
                    .entry(at)
                    .or_default()
                    .entry(target)
                    .or_default()
                    .insert(device);
            }
        }
    }

    /// Shortest path from `from` to `to`, as the full hop sequence including
    /// both endpoints. Breadth-first over edges in insertion order, so ties
    /// between equal-length paths resolve to the first one discovered.
    pub fn shortest_path(&self, from: NetworkId, to: NetworkId) -> Option<Vec<NetworkId>> {
        if from == to {
            return Some(vec![from]);
        }
        let mut parent: IndexMap<NetworkId, NetworkId> = IndexMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            let Some(targets) = self.edges.get(&current) else {
                continue;
            };
            for &next in targets.keys() {
                if next == from || parent.contains_key(&next) {
                    continue;
                }
                parent.insert(next, current);
                if next == to {
                    let mut path = vec![to];
                    let mut node = to;
                    while let Some(&prev) = parent.get(&node) {
                        path.push(prev);
                        node = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Devices available for the hop `from -> to`, in insertion order.
    /// A missing edge yields an empty iterator.
    pub fn edge_devices(
        &self,
        from: NetworkId,
        to: NetworkId,
    ) -> impl Iterator<Item = DeviceId> + '_ {
        self.edges
            .get(&from)
            .and_then(|targets| targets.get(&to))
            .into_iter()
            .flat_map(|devices| devices.iter().copied())
    }

    /// Number of devices available for the hop `from -> to`.
    pub fn edge_device_count(&self, from: NetworkId, to: NetworkId) -> usize {
        self.edges
            .get(&from)
            .and_then(|targets| targets.get(&to))
            .map_or(0, IndexSet::len)
    }

    /// Devices currently residing at `network`, in insertion order.
    pub fn residents(&self, network: NetworkId) -> impl Iterator<Item = DeviceId> + '_ {
        self.residents
            .get(&network)
            .into_iter()
            .flat_map(|devices| devices.iter().copied())
    }

    /// Apply a single-hop move of `device` along the edge `from -> to`.
    ///
    /// The device leaves all outgoing edges of `from` (it is no longer there
    /// to be handed over), becomes a resident of `to`, and is re-linked onward
    /// from `to` based on where it now actually sits. Emptied edges are
    /// dropped so the non-empty-edge invariant keeps holding.
    pub fn move_device(
        &mut self,
        from: NetworkId,
        to: NetworkId,
        device: DeviceId,
        access: &impl Accessibility,
    ) -> Result<(), EngineError> {
        let on_edge = self
            .edges
            .get(&from)
            .and_then(|targets| targets.get(&to))
            .is_some_and(|devices| devices.contains(&device));
        if !on_edge {
            return Err(EngineError::configuration(
                self.slot,
                format!("device {device} cannot transfer from network {from} to network {to}"),
            ));
        }
        debug_assert!(
            self.residents
                .get(&from)
                .is_some_and(|devices| devices.contains(&device)),
            "edge membership implies residency"
        );

        if let Some(targets) = self.edges.get_mut(&from) {
            targets.retain(|_, devices| {
                devices.shift_remove(&device);
                !devices.is_empty()
            });
            if targets.is_empty() {
                self.edges.shift_remove(&from);
            }
        }

        if let Some(devices) = self.residents.get_mut(&from) {
            devices.shift_remove(&device);
        }
        self.residents.entry(to).or_default().insert(device);
        self.link_onward(to, device, access);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsel_types::AccessTable;

    fn net(id: u32) -> NetworkId {
        NetworkId(id)
    }

    fn dev(id: u32) -> DeviceId {
        DeviceId(id)
    }

    fn make_table(networks: &[&[u32]]) -> AccessTable {
        AccessTable::new(
            networks
                .iter()
                .map(|ids| ids.iter().map(|&id| DeviceId(id)).collect())
                .collect(),
        )
    }

    fn make_snapshot(rates: &[f64], members: &[&[u32]]) -> SlotSnapshot {
        SlotSnapshot::new(
            TimeSlot(1),
            rates.to_vec(),
            members
                .iter()
                .map(|ids| ids.iter().map(|&id| DeviceId(id)).collect())
                .collect(),
        )
        .unwrap()
    }

    fn edge(graph: &TransferGraph, from: u32, to: u32) -> Vec<DeviceId> {
        graph.edge_devices(net(from), net(to)).collect()
    }

    #[test]
    fn test_build_links_residents_onward() {
        let snapshot = make_snapshot(&[1.0, 1.0, 1.0], &[&[1, 2], &[3], &[]]);
        let access = make_table(&[&[1, 2, 3], &[1, 3], &[2]]);
        let graph = TransferGraph::build(&snapshot, &access);

        assert_eq!(edge(&graph, 1, 2), vec![dev(1)]);
        assert_eq!(edge(&graph, 1, 3), vec![dev(2)]);
        assert_eq!(edge(&graph, 2, 1), vec![dev(3)]);
        assert_eq!(graph.edge_device_count(net(2), net(3)), 0);
        assert_eq!(graph.edge_device_count(net(3), net(1)), 0);
        // Never a self-edge, even though device 1 can access network 1.
        assert_eq!(graph.edge_device_count(net(1), net(1)), 0);

        assert_eq!(graph.residents(net(1)).collect::<Vec<_>>(), vec![dev(1), dev(2)]);
        assert_eq!(graph.residents(net(3)).count(), 0);
    }

    #[test]
    fn test_build_keeps_stale_assignments_in_place() {
        // Device 5 is assigned to network 1 but can only access network 2:
        // it still sits at network 1, with an outgoing edge to where it may go.
        let snapshot = make_snapshot(&[1.0, 1.0], &[&[5], &[]]);
        let access = make_table(&[&[], &[5]]);
        let graph = TransferGraph::build(&snapshot, &access);

        assert_eq!(graph.residents(net(1)).collect::<Vec<_>>(), vec![dev(5)]);
        assert_eq!(edge(&graph, 1, 2), vec![dev(5)]);
    }

    #[test]
    fn test_no_empty_edge_sets() {
        let snapshot = make_snapshot(&[1.0, 1.0, 1.0], &[&[1], &[2], &[]]);
        let access = make_table(&[&[1, 2], &[1], &[]]);
        let graph = TransferGraph::build(&snapshot, &access);
        for targets in graph.edges.values() {
            for devices in targets.values() {
                assert!(!devices.is_empty());
            }
        }
    }

    #[test]
    fn test_shortest_path_direct_and_relayed() {
        // 1 -> 2 via device 1, 2 -> 3 via device 2, no direct 1 -> 3 edge.
        let snapshot = make_snapshot(&[1.0, 1.0, 1.0], &[&[1], &[2], &[]]);
        let access = make_table(&[&[], &[1], &[2]]);
        let graph = TransferGraph::build(&snapshot, &access);

        assert_eq!(
            graph.shortest_path(net(1), net(2)),
            Some(vec![net(1), net(2)])
        );
        assert_eq!(
            graph.shortest_path(net(1), net(3)),
            Some(vec![net(1), net(2), net(3)])
        );
        assert_eq!(graph.shortest_path(net(3), net(1)), None);
    }

    #[test]
    fn test_shortest_path_breaks_ties_by_insertion_order() {
        // Two hop-2 routes from 1 to 4: via 2 and via 3. Edges out of
        // network 1 enumerate targets in ascending id order, so the search
        // discovers the route through 2 first.
        let snapshot = make_snapshot(&[1.0; 4], &[&[1], &[2], &[3], &[]]);
        let access = make_table(&[&[], &[1], &[1], &[2, 3]]);
        let graph = TransferGraph::build(&snapshot, &access);

        assert_eq!(
            graph.shortest_path(net(1), net(4)),
            Some(vec![net(1), net(2), net(4)])
        );
    }

    #[test]
    fn test_move_device_updates_edges_and_residents() {
        let snapshot = make_snapshot(&[1.0, 1.0, 1.0], &[&[1, 2], &[], &[]]);
        let access = make_table(&[&[], &[1, 2], &[1]]);
        let mut graph = TransferGraph::build(&snapshot, &access);
        assert_eq!(edge(&graph, 1, 2), vec![dev(1), dev(2)]);
        assert_eq!(edge(&graph, 1, 3), vec![dev(1)]);

        graph
            .move_device(net(1), net(2), dev(1), &access)
            .unwrap();

        // Gone from every outgoing edge of network 1; the emptied 1 -> 3
        // edge disappears entirely.
        assert_eq!(edge(&graph, 1, 2), vec![dev(2)]);
        assert_eq!(graph.edge_device_count(net(1), net(3)), 0);

        assert_eq!(graph.residents(net(1)).collect::<Vec<_>>(), vec![dev(2)]);
        assert_eq!(graph.residents(net(2)).collect::<Vec<_>>(), vec![dev(1)]);

        // Onward reachability now derives from network 2, where it sits.
        assert_eq!(edge(&graph, 2, 3), vec![dev(1)]);
        assert_eq!(graph.edge_device_count(net(2), net(1)), 0);
    }

    #[test]
    fn test_move_device_supports_relays() {
        let snapshot = make_snapshot(&[1.0, 1.0, 1.0], &[&[7], &[], &[]]);
        let access = make_table(&[&[], &[7], &[7]]);
        let mut graph = TransferGraph::build(&snapshot, &access);

        graph.move_device(net(1), net(2), dev(7), &access).unwrap();
        graph.move_device(net(2), net(3), dev(7), &access).unwrap();

        assert_eq!(graph.residents(net(3)).collect::<Vec<_>>(), vec![dev(7)]);
        // From network 3 the device links back to network 2.
        assert_eq!(edge(&graph, 3, 2), vec![dev(7)]);
        assert_eq!(graph.edge_device_count(net(1), net(2)), 0);
    }

    #[test]
    fn test_move_device_rejects_missing_edge() {
        let snapshot = make_snapshot(&[1.0, 1.0], &[&[1], &[]]);
        let access = make_table(&[&[1], &[]]);
        let mut graph = TransferGraph::build(&snapshot, &access);

        let err = graph
            .move_device(net(1), net(2), dev(1), &access)
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }
}
