//! Nodes, edges and the graph that owns them.
//!
//! A [`World`] is built once and never mutated after wiring begins. Edges
//! are stored in insertion order and the per-node adjacency index follows
//! the same order, so every consumer that enumerates a node's neighbors
//! sees them in one stable sequence.

use std::collections::VecDeque;
use std::fmt;

use crate::error::{Error, Result};

/// Identity of a graph vertex. Ids are dense and 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub usize);

impl NodeId {
    /// Position of this node in node-indexed tables.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// A graph vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub id: NodeId,
}

/// An edge between two nodes.
///
/// `weight` is carried for weighted variants and ignored by flooding.
/// `directed` is always false for generated graphs; adjacency treats every
/// edge as undirected regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: u32,
    pub directed: bool,
}

impl Edge {
    /// Create an undirected edge.
    pub const fn undirected(from: NodeId, to: NodeId, weight: u32) -> Self {
        Self {
            from,
            to,
            weight,
            directed: false,
        }
    }
}

/// A graph: the full node list plus the full edge list.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct World {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[cfg_attr(feature = "serde", serde(skip))]
    adjacency: Vec<Vec<NodeId>>,
}

impl World {
    /// A world with no nodes and no edges.
    pub fn blank() -> Self {
        Self::default()
    }

    /// A world with `node_count` isolated nodes.
    pub fn with_nodes(node_count: usize) -> Self {
        Self {
            nodes: (0..node_count).map(|id| Node { id: NodeId(id) }).collect(),
            edges: Vec::new(),
            adjacency: vec![Vec::new(); node_count],
        }
    }

    /// Build a world from explicit undirected edges with weight 1.
    pub fn from_edges(node_count: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut world = Self::with_nodes(node_count);
        for &(a, b) in edges {
            world.add_edge(Edge::undirected(NodeId(a), NodeId(b), 1))?;
        }
        Ok(world)
    }

    /// Append an edge after checking it against the graph invariants.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        let index = self.edges.len();
        for node in [edge.from, edge.to] {
            if !self.contains(node) {
                return Err(Error::UnknownNode { edge: index, node });
            }
        }
        if edge.from == edge.to {
            return Err(Error::SelfLoop {
                edge: index,
                node: edge.from,
            });
        }
        if self.has_edge(edge.from, edge.to) {
            return Err(Error::DuplicateEdge {
                edge: index,
                a: edge.from,
                b: edge.to,
            });
        }

        self.adjacency[edge.from.index()].push(edge.to);
        self.adjacency[edge.to.index()].push(edge.from);
        self.edges.push(edge);
        Ok(())
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether `id` names a node of this world.
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Whether an edge joins `a` and `b` in either orientation.
    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(a.index())
            .is_some_and(|adj| adj.contains(&b))
    }

    /// Ids reachable from `id` by exactly one edge, in edge order.
    ///
    /// Unknown ids have no neighbors.
    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.adjacency
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.neighbors(id).len()
    }

    /// Mean degree over all nodes.
    pub fn mean_degree(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        2.0 * self.edges.len() as f64 / self.nodes.len() as f64
    }

    /// Re-check every edge against the invariants.
    pub fn validate(&self) -> Result<()> {
        let mut check = Self::with_nodes(self.nodes.len());
        for edge in &self.edges {
            check.add_edge(*edge)?;
        }
        Ok(())
    }

    /// Connected components, each sorted by id, ordered by smallest member.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut seen = vec![false; self.nodes.len()];
        let mut components = Vec::new();

        for start in 0..self.nodes.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = vec![NodeId(start)];
            let mut queue = VecDeque::from([NodeId(start)]);

            while let Some(node) = queue.pop_front() {
                for &next in self.neighbors(node) {
                    if !seen[next.index()] {
                        seen[next.index()] = true;
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        components
    }

    /// Whether every node can reach every other node.
    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }
}

/// Adjacency listing, one `id: [n, n, ]` line per node.
impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{}: [", node.id)?;
            for neighbor in self.neighbors(node.id) {
                write!(f, "{}, ", neighbor)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
