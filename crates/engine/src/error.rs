//! Engine error types.

use netsel_types::TimeSlot;
use thiserror::Error;

/// Errors surfacing from a distance evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The inputs for a slot are inconsistent and no evaluation is possible.
    #[error("configuration error at slot {slot}: {reason}")]
    Configuration { slot: TimeSlot, reason: String },

    /// Deficit resolution stopped making progress before all networks
    /// reached their target count.
    #[error("deficit resolution failed to converge at slot {slot} after {cycles} path-length cycles")]
    Convergence { slot: TimeSlot, cycles: u32 },
}

impl EngineError {
    pub(crate) fn configuration(slot: TimeSlot, reason: impl Into<String>) -> Self {
        Self::Configuration {
            slot,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_slot() {
        let err = EngineError::configuration(TimeSlot(7), "candidate sums to 3, expected 4");
        assert_eq!(
            err.to_string(),
            "configuration error at slot 7: candidate sums to 3, expected 4"
        );

        let err = EngineError::Convergence {
            slot: TimeSlot(12),
            cycles: 3,
        };
        assert!(err.to_string().contains("slot 12"));
        assert!(err.to_string().contains("3 path-length cycles"));
    }
}
