//! Convergence detection.
//!
//! The monitor polls every worker's report channel on a fixed interval and
//! keeps the latest reported maximum per node. Agreement is only evaluated
//! once every node has reported; until then the run is incomplete, never
//! converged.
//!
//! Agreement is checked per group. With [`ConvergenceScope::PerComponent`]
//! the groups are the connected components of the graph, so components with
//! different maxima can each converge. With [`ConvergenceScope::Global`]
//! there is one group holding every node.
//!
//! A node's maximum is always some seed from its own component, so once a
//! whole component reports one value, that value is the component's true
//! maximum.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use floodmax_topology::{NodeId, World};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::worker::ReportReceiver;

/// Which nodes must agree for a run to count as converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceScope {
    /// Each connected component agrees internally
    #[default]
    PerComponent,
    /// Every node agrees on one value
    Global,
}

impl ConvergenceScope {
    /// The node groups that must each agree.
    pub fn groups(self, world: &World) -> Vec<Vec<NodeId>> {
        match self {
            Self::PerComponent => world.connected_components(),
            Self::Global if world.node_count() == 0 => Vec::new(),
            Self::Global => vec![world.nodes().iter().map(|n| n.id).collect()],
        }
    }
}

impl fmt::Display for ConvergenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerComponent => write!(f, "component"),
            Self::Global => write!(f, "global"),
        }
    }
}

impl FromStr for ConvergenceScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "component" | "per-component" | "per_component" => Ok(Self::PerComponent),
            "global" => Ok(Self::Global),
            other => Err(Error::InvalidConfig(format!(
                "unknown convergence scope {other:?} (expected \"component\" or \"global\")"
            ))),
        }
    }
}

/// The value a group of nodes agreed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMax {
    pub nodes: Vec<NodeId>,
    pub max: u64,
}

/// Outcome of a converged run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Convergence {
    pub scope: ConvergenceScope,
    pub groups: Vec<GroupMax>,
    /// Largest agreed value across all groups
    pub max: u64,
    pub polls: u64,
    pub elapsed: Duration,
}

/// What the monitor currently believes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorStatus {
    /// These nodes have never reported
    Incomplete { missing: Vec<NodeId> },
    /// Everyone reported, but some groups hold more than one value
    Disagreeing { groups: usize, distinct: usize },
    /// Every group agrees
    Agreed(Vec<GroupMax>),
}

impl MonitorStatus {
    pub fn is_agreed(&self) -> bool {
        matches!(self, Self::Agreed(_))
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete { missing } => {
                write!(f, "{} nodes have not reported", missing.len())
            }
            Self::Disagreeing { groups, distinct } => {
                write!(f, "{groups} groups disagree across {distinct} distinct values")
            }
            Self::Agreed(groups) => write!(f, "{} groups agree", groups.len()),
        }
    }
}

/// Polling schedule and budget for a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    /// Give up after this many polls
    pub max_polls: Option<u64>,
    /// Give up after this much wall-clock time
    pub timeout: Option<Duration>,
    pub scope: ConvergenceScope,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_polls: None,
            timeout: None,
            scope: ConvergenceScope::default(),
        }
    }
}

/// Watches every worker's reports and decides when the run has settled.
#[derive(Debug)]
pub struct Monitor {
    reports: Vec<ReportReceiver>,
    reported: Vec<Option<u64>>,
    groups: Vec<Vec<NodeId>>,
    config: MonitorConfig,
    polls: u64,
}

impl Monitor {
    /// `reports[i]` must belong to node `i` of `world`.
    pub fn new(reports: Vec<ReportReceiver>, world: &World, config: MonitorConfig) -> Self {
        let groups = config.scope.groups(world);
        let reported = vec![None; reports.len()];
        Self {
            reports,
            reported,
            groups,
            config,
            polls: 0,
        }
    }

    /// Latest recorded maximum of `node`.
    pub fn reported(&self, node: NodeId) -> Option<u64> {
        self.reported.get(node.index()).copied().flatten()
    }

    /// Record the latest report of every node. Returns how many changed.
    pub fn collect(&mut self) -> usize {
        let mut changed = 0;
        for (slot, rx) in self.reported.iter_mut().zip(self.reports.iter_mut()) {
            let latest = rx.borrow_and_update().map(|msg| msg.payload);
            if latest.is_some() && latest != *slot {
                *slot = latest;
                changed += 1;
            }
        }
        changed
    }

    /// Evaluate agreement over the recorded values.
    pub fn status(&self) -> MonitorStatus {
        let missing: Vec<NodeId> = self
            .reported
            .iter()
            .enumerate()
            .filter(|(_, value)| value.is_none())
            .map(|(i, _)| NodeId(i))
            .collect();
        if !missing.is_empty() {
            return MonitorStatus::Incomplete { missing };
        }

        let mut agreed = Vec::with_capacity(self.groups.len());
        let mut disagreeing = 0;
        for group in &self.groups {
            let values: BTreeSet<u64> = group.iter().filter_map(|&n| self.reported(n)).collect();
            match (values.len(), values.first()) {
                (1, Some(&max)) => agreed.push(GroupMax {
                    nodes: group.clone(),
                    max,
                }),
                _ => disagreeing += 1,
            }
        }

        if disagreeing > 0 {
            let distinct: BTreeSet<u64> = self.reported.iter().flatten().copied().collect();
            return MonitorStatus::Disagreeing {
                groups: disagreeing,
                distinct: distinct.len(),
            };
        }
        MonitorStatus::Agreed(agreed)
    }

    /// One poll: collect, then evaluate.
    pub fn poll(&mut self) -> MonitorStatus {
        self.polls += 1;
        let changed = self.collect();
        let status = self.status();
        debug!(poll = self.polls, changed, %status, "Monitor poll");
        status
    }

    /// Poll on the configured interval until agreement or budget exhaustion.
    ///
    /// The wall-clock budget is raced against the poll ticker, so a run never
    /// outlives `timeout` by more than one final poll.
    pub async fn run(mut self) -> Result<Convergence> {
        let started = Instant::now();
        let deadline = self.config.timeout.map(|limit| started + limit);
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; start polling one interval in.
        ticker.tick().await;

        loop {
            let expired = tokio::select! {
                _ = ticker.tick() => false,
                _ = tokio::time::sleep_until(deadline.unwrap_or(started)), if deadline.is_some() => true,
            };
            let status = self.poll();
            let elapsed = started.elapsed();

            if let MonitorStatus::Agreed(groups) = status {
                let max = groups.iter().map(|g| g.max).max().unwrap_or(0);
                info!(
                    max,
                    groups = groups.len(),
                    polls = self.polls,
                    ?elapsed,
                    "Converged"
                );
                return Ok(Convergence {
                    scope: self.config.scope,
                    groups,
                    max,
                    polls: self.polls,
                    elapsed,
                });
            }

            info!(poll = self.polls, %status, "Not converged yet");

            let out_of_polls = self.config.max_polls.is_some_and(|max| self.polls >= max);
            let out_of_time = expired || deadline.is_some_and(|d| Instant::now() >= d);
            if out_of_polls || out_of_time {
                return Err(Error::NotConverged {
                    polls: self.polls,
                    elapsed,
                    status,
                });
            }
        }
    }
}
