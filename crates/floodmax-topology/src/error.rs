//! Error types for floodmax-topology.

use thiserror::Error;

use crate::NodeId;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while generating or validating a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Edge probability `d / (n - 1)` is undefined for fewer than two nodes.
    #[error("node count must be at least 2, got {0}")]
    TooFewNodes(usize),

    /// Expected degree is negative or not a finite number.
    #[error("expected degree must be a finite non-negative number, got {0}")]
    InvalidDegree(f64),

    /// Expected degree implies an edge probability above 1.
    #[error("expected degree {degree} implies edge probability {probability:.3} for {nodes} nodes")]
    ProbabilityOutOfRange {
        degree: f64,
        nodes: usize,
        probability: f64,
    },

    /// An edge references a node the world does not contain.
    #[error("edge {edge} references unknown node {node}")]
    UnknownNode { edge: usize, node: NodeId },

    /// An edge connects a node to itself.
    #[error("edge {edge} is a self-loop on node {node}")]
    SelfLoop { edge: usize, node: NodeId },

    /// Two edges connect the same pair of nodes.
    #[error("edge {edge} duplicates an existing edge between {a} and {b}")]
    DuplicateEdge { edge: usize, a: NodeId, b: NodeId },
}
