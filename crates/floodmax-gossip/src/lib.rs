//! Flooding Max - Distributed Maximum Finding by Gossip
//!
//! Every node of a [`World`](floodmax_topology::World) runs an independent
//! worker that knows only its own seed value and its direct neighbors.
//! Workers flood their best known maximum until every node in a connected
//! component agrees on the largest seed in it. No worker ever sees global
//! state.
//!
//! # Pipeline
//!
//! 1. **Generate**: a random graph with a target expected degree
//! 2. **Wire**: two bounded FIFO links per edge, grouped into per-node [`Port`]s
//! 3. **Flood**: one [`Worker`] task per node, driving a [`MaxState`]
//! 4. **Monitor**: poll each worker's latest report until every group agrees
//!
//! # Flooding Rule
//!
//! - Start with `max = seed` and every neighbor flagged
//! - On a larger value from any neighbor: raise `max`, report it, flag everyone
//! - On a flagged, idle port: send `max` and clear the flag
//!
//! # Example
//!
//! ```rust,ignore
//! use floodmax_gossip::{Simulation, SimulationConfig};
//!
//! let sim = Simulation::from_config(SimulationConfig::new(1000, 3.0))?;
//! let outcome = sim.run().await?;
//! println!("Max: {}", outcome.convergence.max);
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod monitor;
pub mod simulation;
pub mod state;
pub mod wiring;
pub mod worker;

pub use config::SimulationConfig;
pub use error::{Error, Result};
pub use message::{Message, MessageKind};
pub use monitor::{Convergence, ConvergenceScope, GroupMax, Monitor, MonitorConfig, MonitorStatus};
pub use simulation::{Outcome, Simulation};
pub use state::{MaxState, MaxUpdate};
pub use wiring::{Port, Wiring};
pub use worker::{report_channel, ReportReceiver, ReportSender, Scan, Worker, WorkerStats, WorkerSummary};

// Re-export topology types for convenience
pub use floodmax_topology::{Edge, GraphConfig, Node, NodeId, World};
