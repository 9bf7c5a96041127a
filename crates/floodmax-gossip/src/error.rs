//! Error types for floodmax-gossip.

use std::time::Duration;

use floodmax_topology::NodeId;
use thiserror::Error;

use crate::monitor::MonitorStatus;

/// Result type for floodmax-gossip operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or running a simulation.
#[derive(Debug, Error)]
pub enum Error {
    /// The graph could not be generated or violates an invariant.
    #[error("topology error: {0}")]
    Topology(#[from] floodmax_topology::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Seed values do not line up with the nodes of the world.
    #[error("expected {nodes} seed values, got {values}")]
    ValueCountMismatch { nodes: usize, values: usize },

    /// The monitor ran out of budget before the nodes agreed.
    #[error("no convergence after {polls} polls ({elapsed:?}): {status}")]
    NotConverged {
        polls: u64,
        elapsed: Duration,
        status: MonitorStatus,
    },

    /// A worker task panicked or was cancelled.
    #[error("worker for node {0} did not shut down cleanly")]
    WorkerPanicked(NodeId),
}
