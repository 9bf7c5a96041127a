//! Flooding Topology
//!
//! Random undirected graphs for distributed-algorithm simulations.
//!
//! # Model
//!
//! A [`World`] owns a dense, 0-indexed node list and an edge list. Edges
//! are undirected for adjacency purposes: no self-loops, and at most one
//! edge per unordered pair.
//!
//! # Generation
//!
//! [`generate`] samples every unordered pair of nodes once with probability
//! `degree / (node_count - 1)`. The caller supplies the random source, so a
//! seeded generator reproduces a graph exactly.

mod error;
mod generate;
mod world;

pub use error::{Error, Result};
pub use generate::{generate, GraphConfig, MAX_WEIGHT};
pub use world::{Edge, Node, NodeId, World};
