//! Point-to-point links derived from a [`World`].
//!
//! Every edge `(a, b)` becomes two bounded FIFO channels, `a -> b` and
//! `b -> a`. A node sees each incident edge as one [`Port`] that bundles
//! the outbound sender and the inbound receiver for the same neighbor, so
//! a port index always names one neighbor in both directions.

use floodmax_topology::{Error as TopologyError, NodeId, World};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::message::Message;

/// One neighbor position of a node.
#[derive(Debug)]
pub struct Port {
    /// The node at the other end of the edge
    pub neighbor: NodeId,
    /// Messages from this node to `neighbor`
    pub outbound: mpsc::Sender<Message>,
    /// Messages from `neighbor` to this node
    pub inbound: mpsc::Receiver<Message>,
}

/// Node-indexed port tables for a whole world.
#[derive(Debug)]
pub struct Wiring {
    tables: Vec<Option<Vec<Port>>>,
    capacity: usize,
}

impl Wiring {
    /// Create two links per edge, each holding at most `capacity` messages.
    pub fn new(world: &World, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "link capacity must be at least 1".into(),
            ));
        }

        let mut tables: Vec<Vec<Port>> = (0..world.node_count()).map(|_| Vec::new()).collect();

        for (index, edge) in world.edges().iter().enumerate() {
            for node in [edge.from, edge.to] {
                if !world.contains(node) {
                    return Err(TopologyError::UnknownNode { edge: index, node }.into());
                }
            }

            // from sends, to receives
            let (forward_tx, forward_rx) = mpsc::channel(capacity);
            // to sends, from receives
            let (backward_tx, backward_rx) = mpsc::channel(capacity);

            tables[edge.from.index()].push(Port {
                neighbor: edge.to,
                outbound: forward_tx,
                inbound: backward_rx,
            });
            tables[edge.to.index()].push(Port {
                neighbor: edge.from,
                outbound: backward_tx,
                inbound: forward_rx,
            });
        }

        debug!(
            nodes = world.node_count(),
            links = world.edge_count() * 2,
            capacity,
            "Wired communication links"
        );

        Ok(Self {
            tables: tables.into_iter().map(Some).collect(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ports of `node`, if they have not been taken yet.
    pub fn ports(&self, node: NodeId) -> Option<&[Port]> {
        self.tables.get(node.index())?.as_deref()
    }

    /// Hand the ports of `node` to its worker. Each table can be taken once.
    pub fn take(&mut self, node: NodeId) -> Option<Vec<Port>> {
        self.tables.get_mut(node.index())?.take()
    }
}
