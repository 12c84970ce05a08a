//! Accessibility relation between devices and networks.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{DeviceId, NetworkId, TimeSlot};

/// Which networks a device may associate with at a given time slot.
///
/// Implemented by scenario definitions (where accessibility follows from the
/// current phase) and by test fixtures. Implementations must be pure lookups:
/// the engine queries the same slot repeatedly while simulating moves and
/// relies on stable answers.
pub trait Accessibility {
    /// Whether `device` can reach `network` during `slot`.
    fn can_access(&self, slot: TimeSlot, device: DeviceId, network: NetworkId) -> bool;

    /// The networks out of `1..=num_networks` reachable by `device` at `slot`,
    /// in ascending id order.
    fn accessible_networks(
        &self,
        slot: TimeSlot,
        device: DeviceId,
        num_networks: usize,
    ) -> Vec<NetworkId> {
        (0..num_networks)
            .map(NetworkId::from_index)
            .filter(|&network| self.can_access(slot, device, network))
            .collect()
    }
}

impl<T: Accessibility + ?Sized> Accessibility for &T {
    fn can_access(&self, slot: TimeSlot, device: DeviceId, network: NetworkId) -> bool {
        (**self).can_access(slot, device, network)
    }
}

/// Slot-independent accessibility: one allowed-device set per network.
///
/// The simplest [`Accessibility`] model, for windows where the relation does
/// not change. Scenario phases hold one table each and switch between them as
/// slots advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessTable {
    networks: Vec<IndexSet<DeviceId>>,
}

impl AccessTable {
    pub fn new(networks: Vec<IndexSet<DeviceId>>) -> Self {
        Self { networks }
    }

    /// Number of networks the table covers.
    pub fn num_networks(&self) -> usize {
        self.networks.len()
    }

    /// Devices allowed onto `network`, or `None` for an out-of-range id.
    pub fn allowed(&self, network: NetworkId) -> Option<&IndexSet<DeviceId>> {
        self.networks.get(network.index())
    }
}

impl Accessibility for AccessTable {
    fn can_access(&self, _slot: TimeSlot, device: DeviceId, network: NetworkId) -> bool {
        self.networks
            .get(network.index())
            .is_some_and(|devices| devices.contains(&device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EvenDevicesEverywhere;

    impl Accessibility for EvenDevicesEverywhere {
        fn can_access(&self, _slot: TimeSlot, device: DeviceId, _network: NetworkId) -> bool {
            device.0 % 2 == 0
        }
    }

    #[test]
    fn test_accessible_networks_helper() {
        let model = EvenDevicesEverywhere;
        assert_eq!(
            model.accessible_networks(TimeSlot(1), DeviceId(2), 3),
            vec![NetworkId(1), NetworkId(2), NetworkId(3)]
        );
        assert!(model
            .accessible_networks(TimeSlot(1), DeviceId(3), 3)
            .is_empty());
    }

    #[test]
    fn test_access_table_lookup() {
        let table = AccessTable::new(vec![
            [DeviceId(1), DeviceId(2)].into_iter().collect(),
            [DeviceId(2)].into_iter().collect(),
        ]);
        assert_eq!(table.num_networks(), 2);
        assert!(table.can_access(TimeSlot(1), DeviceId(1), NetworkId(1)));
        assert!(!table.can_access(TimeSlot(1), DeviceId(1), NetworkId(2)));
        assert!(table.can_access(TimeSlot(9), DeviceId(2), NetworkId(2)));
        // Out-of-range networks are simply unreachable.
        assert!(!table.can_access(TimeSlot(1), DeviceId(1), NetworkId(3)));
        assert_eq!(
            table.accessible_networks(TimeSlot(1), DeviceId(2), 2),
            vec![NetworkId(1), NetworkId(2)]
        );
    }
}
