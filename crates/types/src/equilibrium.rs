//! Equilibrium states and move records.

use crate::{DeviceId, NetworkId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Nash-equilibrium allocation: target device count per network.
///
/// Admissible equilibria are supplied by the scenario definition, never
/// computed here. `counts[i]` is the device count for `NetworkId::from_index(i)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquilibriumState(pub Vec<u32>);

impl EquilibriumState {
    /// Number of networks this state covers.
    pub fn num_networks(&self) -> usize {
        self.0.len()
    }

    /// Total devices placed by this state.
    pub fn total_devices(&self) -> u64 {
        self.0.iter().map(|&c| c as u64).sum()
    }

    /// Target count for a network.
    pub fn count(&self, network: NetworkId) -> u32 {
        self.0[network.index()]
    }

    /// Whether the observed per-network counts match this state exactly.
    pub fn matches(&self, counts: &[u32]) -> bool {
        self.0 == counts
    }
}

impl fmt::Display for EquilibriumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, count) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{count}")?;
        }
        write!(f, "]")
    }
}

/// One simulated device move across a transfer-graph edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRecord {
    /// The device that moved.
    pub device: DeviceId,
    /// Network the device left.
    pub from: NetworkId,
    /// Network the device arrived at.
    pub to: NetworkId,
    /// Per-device gain at the source when the move was made. Zero when the
    /// source network was not accessible to the device (it was in transit or
    /// its recorded assignment was stale).
    pub observed_gain: f64,
}

impl MoveRecord {
    /// Whether the device had no claim on its source network's bandwidth.
    pub fn in_transit(&self) -> bool {
        self.observed_gain == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equilibrium_state_accessors() {
        let state = EquilibriumState(vec![2, 4, 14]);
        assert_eq!(state.num_networks(), 3);
        assert_eq!(state.total_devices(), 20);
        assert_eq!(state.count(NetworkId(3)), 14);
        assert!(state.matches(&[2, 4, 14]));
        assert!(!state.matches(&[2, 5, 13]));
        assert_eq!(state.to_string(), "[2, 4, 14]");
    }

    #[test]
    fn test_move_record_transit_flag() {
        let moved = MoveRecord {
            device: DeviceId(3),
            from: NetworkId(1),
            to: NetworkId(2),
            observed_gain: 0.0,
        };
        assert!(moved.in_transit());
    }
}
