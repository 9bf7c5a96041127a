//! The async gossip worker: one task per node.
//!
//! A worker repeatedly scans its ports in order. On each port it either
//! consumes one pending inbound message or, if nothing is pending and the
//! neighbor is flagged, sends the current maximum. When a full scan makes
//! no progress the worker parks on a multiplexed wait across all inbound
//! links and the shutdown signal instead of spinning.
//!
//! Sends never block. A full link leaves the neighbor flagged and the send
//! is retried after `retry_backoff`. A closed link is dropped from the
//! scan.

use std::time::Duration;

use floodmax_topology::NodeId;
use futures::future::select_all;
use serde::Serialize;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::message::Message;
use crate::state::MaxState;
use crate::wiring::Port;

/// Publishes a worker's latest maximum to the monitor.
pub type ReportSender = watch::Sender<Option<Message>>;

/// The monitor's view of one worker's reports.
pub type ReportReceiver = watch::Receiver<Option<Message>>;

/// A fresh report channel. Holds `None` until the worker starts.
pub fn report_channel() -> (ReportSender, ReportReceiver) {
    watch::channel(None)
}

/// Counters kept by a worker over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub sent: u64,
    pub received: u64,
    pub updates: u64,
    /// Sends deferred because the link was full
    pub backpressure: u64,
}

/// Final state of a stopped worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub id: NodeId,
    pub value: u64,
    pub max: u64,
    pub ports: usize,
    pub stats: WorkerStats,
}

/// Result of one pass over every port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scan {
    /// At least one message was consumed or sent
    pub progressed: bool,
    /// At least one send was deferred by a full link
    pub blocked: bool,
}

#[derive(Debug)]
struct Link {
    port: Port,
    inbound_open: bool,
    outbound_open: bool,
    warned_full: bool,
}

enum Wake {
    Message(usize, Message),
    Closed(usize),
    Retry,
    Shutdown,
}

/// A flooding worker for one node.
#[derive(Debug)]
pub struct Worker {
    id: NodeId,
    state: MaxState,
    links: Vec<Link>,
    reports: ReportSender,
    retry_backoff: Duration,
    stats: WorkerStats,
}

impl Worker {
    /// Create a worker and publish its seed as the first report.
    ///
    /// The flag table is sized from `ports`, so flag `i` and port `i`
    /// always refer to the same neighbor.
    pub fn new(
        id: NodeId,
        value: u64,
        ports: Vec<Port>,
        reports: ReportSender,
        retry_backoff: Duration,
    ) -> Self {
        let state = MaxState::new(value, ports.len());
        debug!(
            node = %id,
            value,
            max = state.max(),
            send_ports = ports.len(),
            recv_ports = ports.len(),
            "Starting worker"
        );

        let worker = Self {
            id,
            state,
            links: ports
                .into_iter()
                .map(|port| Link {
                    port,
                    inbound_open: true,
                    outbound_open: true,
                    warned_full: false,
                })
                .collect(),
            reports,
            retry_backoff,
            stats: WorkerStats::default(),
        };
        worker.report();
        worker
    }

    pub fn state(&self) -> &MaxState {
        &self.state
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            id: self.id,
            value: self.state.value(),
            max: self.state.max(),
            ports: self.links.len(),
            stats: self.stats,
        }
    }

    fn report(&self) {
        self.reports
            .send_replace(Some(Message::max(self.id, self.state.max())));
    }

    /// Apply one inbound message. Returns whether the maximum increased.
    pub fn handle(&mut self, port: usize, msg: Message) -> bool {
        self.stats.received += 1;
        trace!(node = %self.id, port, %msg, "Received");

        match self.state.observe(msg.payload) {
            Some(update) => {
                self.stats.updates += 1;
                debug!(
                    node = %self.id,
                    old = update.old,
                    new = update.new,
                    from = %msg.from,
                    "Updated max"
                );
                self.report();
                true
            }
            None => false,
        }
    }

    /// One non-blocking pass over every port, in port order.
    pub fn scan(&mut self) -> Scan {
        let mut scan = Scan::default();

        for i in 0..self.links.len() {
            if let Some(msg) = self.try_recv(i) {
                self.handle(i, msg);
                scan.progressed = true;
                continue;
            }

            if !self.state.needs_send(i) {
                continue;
            }

            let link = &mut self.links[i];
            if !link.outbound_open {
                self.state.mark_sent(i);
                continue;
            }

            let msg = Message::max(self.id, self.state.max());
            match link.port.outbound.try_send(msg) {
                Ok(()) => {
                    self.state.mark_sent(i);
                    self.stats.sent += 1;
                    scan.progressed = true;
                    trace!(
                        node = %self.id,
                        port = i,
                        neighbor = %link.port.neighbor,
                        %msg,
                        "Sent"
                    );
                }
                Err(TrySendError::Full(_)) => {
                    self.stats.backpressure += 1;
                    scan.blocked = true;
                    if !link.warned_full {
                        link.warned_full = true;
                        warn!(
                            node = %self.id,
                            port = i,
                            neighbor = %link.port.neighbor,
                            "Link full, deferring send"
                        );
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    link.outbound_open = false;
                    self.state.mark_sent(i);
                    debug!(
                        node = %self.id,
                        neighbor = %link.port.neighbor,
                        "Outbound link closed"
                    );
                }
            }
        }

        scan
    }

    fn try_recv(&mut self, i: usize) -> Option<Message> {
        let link = &mut self.links[i];
        if !link.inbound_open {
            return None;
        }
        match link.port.inbound.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                link.inbound_open = false;
                None
            }
        }
    }

    /// Run until `shutdown` turns true or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WorkerSummary {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let scan = self.scan();
            if scan.progressed {
                tokio::task::yield_now().await;
                continue;
            }

            match self.wait(scan.blocked, &mut shutdown).await {
                Wake::Message(i, msg) => {
                    self.handle(i, msg);
                }
                Wake::Closed(i) => self.links[i].inbound_open = false,
                Wake::Retry => {}
                Wake::Shutdown => break,
            }
        }

        debug!(
            node = %self.id,
            max = self.state.max(),
            sent = self.stats.sent,
            received = self.stats.received,
            "Worker stopped"
        );
        self.summary()
    }

    async fn wait(&mut self, blocked: bool, shutdown: &mut watch::Receiver<bool>) -> Wake {
        let retry = self.retry_backoff;
        tokio::select! {
            wake = next_inbound(&mut self.links) => wake,
            _ = shutdown.changed() => Wake::Shutdown,
            _ = tokio::time::sleep(retry), if blocked => Wake::Retry,
        }
    }
}

/// Wait for the first message on any open inbound link.
async fn next_inbound(links: &mut [Link]) -> Wake {
    let pending: Vec<_> = links
        .iter_mut()
        .enumerate()
        .filter(|(_, link)| link.inbound_open)
        .map(|(i, link)| Box::pin(async move { (i, link.port.inbound.recv().await) }))
        .collect();

    if pending.is_empty() {
        return std::future::pending().await;
    }

    let ((i, received), _, _) = select_all(pending).await;
    match received {
        Some(msg) => Wake::Message(i, msg),
        None => Wake::Closed(i),
    }
}
