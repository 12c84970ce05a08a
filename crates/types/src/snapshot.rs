//! Per-slot state snapshot consumed by the distance engine.

use crate::{DeviceId, NetworkId, TimeSlot};
use indexmap::IndexSet;
use thiserror::Error;

/// Errors constructing a [`SlotSnapshot`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    /// Rates and membership vectors disagree on the number of networks.
    #[error("snapshot shape mismatch: {rates} rates but {members} membership sets")]
    ShapeMismatch { rates: usize, members: usize },

    /// A network's data rate is not a positive finite number.
    #[error("network {network} has non-positive data rate {rate}")]
    NonPositiveRate { network: NetworkId, rate: f64 },

    /// The same device is recorded as assigned to two networks.
    #[error("device {device} assigned to both network {first} and network {second}")]
    DuplicateAssignment {
        device: DeviceId,
        first: NetworkId,
        second: NetworkId,
    },
}

/// The observed assignment state for one time slot.
///
/// Produced externally (by a selection workload or a recorded trace) and
/// consumed whole by the distance engine. `rates` and `members` are indexed by
/// `NetworkId::index()`, so both have length `K`.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot {
    slot: TimeSlot,
    rates: Vec<f64>,
    members: Vec<IndexSet<DeviceId>>,
}

impl SlotSnapshot {
    /// Build a snapshot, validating its shape.
    ///
    /// The membership sets must partition the active devices: a device present
    /// in two sets is rejected. Devices absent from every set are simply
    /// inactive this slot.
    pub fn new(
        slot: TimeSlot,
        rates: Vec<f64>,
        members: Vec<IndexSet<DeviceId>>,
    ) -> Result<Self, SnapshotError> {
        if rates.len() != members.len() {
            return Err(SnapshotError::ShapeMismatch {
                rates: rates.len(),
                members: members.len(),
            });
        }
        for (index, &rate) in rates.iter().enumerate() {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(SnapshotError::NonPositiveRate {
                    network: NetworkId::from_index(index),
                    rate,
                });
            }
        }
        for (index, set) in members.iter().enumerate() {
            for &device in set {
                for (earlier, other) in members.iter().enumerate().take(index) {
                    if other.contains(&device) {
                        return Err(SnapshotError::DuplicateAssignment {
                            device,
                            first: NetworkId::from_index(earlier),
                            second: NetworkId::from_index(index),
                        });
                    }
                }
            }
        }
        Ok(Self {
            slot,
            rates,
            members,
        })
    }

    /// The slot this snapshot describes.
    pub fn slot(&self) -> TimeSlot {
        self.slot
    }

    /// Number of networks `K`.
    pub fn num_networks(&self) -> usize {
        self.rates.len()
    }

    /// Total number of assigned devices `N`.
    pub fn num_devices(&self) -> usize {
        self.members.iter().map(IndexSet::len).sum()
    }

    /// Data rate of a network.
    pub fn rate(&self, network: NetworkId) -> f64 {
        self.rates[network.index()]
    }

    /// Devices currently assigned to a network, in insertion order.
    pub fn members(&self, network: NetworkId) -> &IndexSet<DeviceId> {
        &self.members[network.index()]
    }

    /// Per-network device counts, indexed by `NetworkId::index()`.
    pub fn counts(&self) -> Vec<u32> {
        self.members.iter().map(|set| set.len() as u32).collect()
    }

    /// Network identifiers in index order.
    pub fn network_ids(&self) -> impl Iterator<Item = NetworkId> + '_ {
        (0..self.rates.len()).map(NetworkId::from_index)
    }

    /// All assigned devices, grouped by network in index order.
    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.members.iter().flat_map(|set| set.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u32]) -> IndexSet<DeviceId> {
        ids.iter().map(|&id| DeviceId(id)).collect()
    }

    #[test]
    fn test_snapshot_counts_and_totals() {
        let snapshot = SlotSnapshot::new(
            TimeSlot(1),
            vec![10.0, 20.0],
            vec![set(&[1, 2, 3]), set(&[4])],
        )
        .unwrap();

        assert_eq!(snapshot.num_networks(), 2);
        assert_eq!(snapshot.num_devices(), 4);
        assert_eq!(snapshot.counts(), vec![3, 1]);
        assert_eq!(snapshot.rate(NetworkId(2)), 20.0);
        assert!(snapshot.members(NetworkId(1)).contains(&DeviceId(2)));
    }

    #[test]
    fn test_snapshot_rejects_shape_mismatch() {
        let err = SlotSnapshot::new(TimeSlot(1), vec![10.0], vec![]).unwrap_err();
        assert_eq!(
            err,
            SnapshotError::ShapeMismatch {
                rates: 1,
                members: 0
            }
        );
    }

    #[test]
    fn test_snapshot_rejects_bad_rate() {
        let err =
            SlotSnapshot::new(TimeSlot(1), vec![10.0, 0.0], vec![set(&[1]), set(&[])]).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::NonPositiveRate {
                network: NetworkId(2),
                ..
            }
        ));
    }

    #[test]
    fn test_snapshot_rejects_duplicate_assignment() {
        let err =
            SlotSnapshot::new(TimeSlot(1), vec![10.0, 20.0], vec![set(&[1]), set(&[1])])
                .unwrap_err();
        assert_eq!(
            err,
            SnapshotError::DuplicateAssignment {
                device: DeviceId(1),
                first: NetworkId(1),
                second: NetworkId(2),
            }
        );
    }
}
