//! Simulator-level errors.

use netsel_engine::EngineError;
use netsel_types::{RunId, SnapshotError, TimeSlot};
use thiserror::Error;

use crate::trace::TraceError;

/// Error raised while simulating, replaying or aggregating runs.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// The engine rejected a slot; the affected run is aborted.
    #[error("run {run} failed at slot {slot}: {source}")]
    Engine {
        run: RunId,
        slot: TimeSlot,
        #[source]
        source: EngineError,
    },

    /// A generated allocation was malformed.
    #[error("snapshot construction failed: {0}")]
    Snapshot(#[from] SnapshotError),

    /// A recorded trace could not be read or parsed.
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// Result tables could not be written.
    #[error("failed to write results: {0}")]
    Io(#[from] std::io::Error),

    /// The distance histogram could not be allocated.
    #[error("failed to build distance histogram: {0}")]
    Histogram(#[from] hdrhistogram::errors::CreationError),
}
