//! Messages exchanged between workers and reported to the monitor.

use std::fmt;

use floodmax_topology::NodeId;
use serde::Serialize;

/// What a message is saying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    /// "My current maximum is `payload`."
    Max,
}

/// An immutable gossip message. Created fresh for every send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    pub from: NodeId,
    pub payload: u64,
}

impl Message {
    /// A maximum report from `from`.
    pub const fn max(from: NodeId, payload: u64) -> Self {
        Self {
            kind: MessageKind::Max,
            from,
            payload,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MessageKind::Max => write!(f, "Max({}) from {}", self.payload, self.from),
        }
    }
}
