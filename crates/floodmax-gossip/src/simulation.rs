//! End-to-end runs: generate, wire, spawn workers, monitor, shut down.

use floodmax_topology::{generate, NodeId, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use crate::monitor::{Convergence, GroupMax, Monitor};
use crate::wiring::Wiring;
use crate::worker::{report_channel, Worker, WorkerSummary};

/// A converged run.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub convergence: Convergence,
    /// One summary per node, in id order
    pub workers: Vec<WorkerSummary>,
}

impl Outcome {
    /// Messages sent over all links.
    pub fn messages_sent(&self) -> u64 {
        self.workers.iter().map(|w| w.stats.sent).sum()
    }
}

/// A world plus one seed value per node, ready to run.
#[derive(Debug, Clone)]
pub struct Simulation {
    world: World,
    values: Vec<u64>,
    config: SimulationConfig,
}

impl Simulation {
    /// Generate a graph and seed values from `config`.
    ///
    /// Uses `config.seed` when present, otherwise draws a seed from entropy
    /// and stores it back into the config so the run can be reproduced.
    pub fn from_config(mut config: SimulationConfig) -> Result<Self> {
        let seed = config.seed.unwrap_or_else(rand::random);
        config.seed = Some(seed);
        info!(seed, "Seeding random source");
        Self::generate(config, &mut StdRng::seed_from_u64(seed))
    }

    /// Generate a graph and seed values from an explicit random source.
    pub fn generate<R: Rng + ?Sized>(config: SimulationConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let world = generate(&config.graph(), rng)?;
        let values = (0..world.node_count())
            .map(|_| rng.gen_range(0..config.max_value))
            .collect();
        Ok(Self {
            world,
            values,
            config,
        })
    }

    /// Run over a given world with given seed values, `values[i]` for node `i`.
    pub fn with_values(world: World, values: Vec<u64>, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        if world.node_count() == 0 {
            return Err(Error::InvalidConfig("world has no nodes".into()));
        }
        if values.len() != world.node_count() {
            return Err(Error::ValueCountMismatch {
                nodes: world.node_count(),
                values: values.len(),
            });
        }
        world.validate()?;
        Ok(Self {
            world,
            values,
            config,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The true maximum of every group the monitor will check.
    pub fn expected(&self) -> Vec<GroupMax> {
        self.config
            .scope
            .groups(&self.world)
            .into_iter()
            .map(|nodes| {
                let max = nodes
                    .iter()
                    .map(|n| self.values[n.index()])
                    .max()
                    .unwrap_or(0);
                GroupMax { nodes, max }
            })
            .collect()
    }

    /// Spawn one worker per node and wait for the monitor's verdict.
    ///
    /// Workers are always shut down before returning, converged or not.
    pub async fn run(self) -> Result<Outcome> {
        let capacity = self.config.link_capacity_for(self.world.node_count());
        let mut wiring = Wiring::new(&self.world, capacity)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut reports = Vec::with_capacity(self.world.node_count());
        let mut handles = Vec::with_capacity(self.world.node_count());
        for node in self.world.nodes() {
            let ports = wiring.take(node.id).unwrap_or_default();
            let (report_tx, report_rx) = report_channel();
            let worker = Worker::new(
                node.id,
                self.values[node.id.index()],
                ports,
                report_tx,
                self.config.retry_backoff,
            );
            reports.push(report_rx);
            handles.push(tokio::spawn(worker.run(shutdown_rx.clone())));
        }
        info!(
            workers = handles.len(),
            links = self.world.edge_count() * 2,
            capacity,
            "Workers started"
        );

        let verdict = Monitor::new(reports, &self.world, self.config.monitor())
            .run()
            .await;

        shutdown_tx.send_replace(true);
        let mut workers = Vec::with_capacity(handles.len());
        for (i, handle) in handles.into_iter().enumerate() {
            let summary = handle.await.map_err(|_| Error::WorkerPanicked(NodeId(i)))?;
            workers.push(summary);
        }
        debug!(workers = workers.len(), "Workers stopped");

        let convergence = verdict?;
        info!(max = convergence.max, "Max: {}", convergence.max);
        Ok(Outcome {
            convergence,
            workers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ConvergenceScope;
    use std::time::Duration;

    fn fast() -> SimulationConfig {
        SimulationConfig::default()
            .with_poll_interval(Duration::from_millis(5))
            .with_timeout(Duration::from_secs(10))
    }

    #[test]
    fn rejects_mismatched_values() {
        let world = World::from_edges(3, &[(0, 1)]).unwrap();
        assert!(matches!(
            Simulation::with_values(world, vec![1, 2], fast()),
            Err(Error::ValueCountMismatch { nodes: 3, values: 2 })
        ));
    }

    #[test]
    fn rejects_empty_world() {
        assert!(matches!(
            Simulation::with_values(World::blank(), vec![], fast()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn generation_errors_surface() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            Simulation::generate(SimulationConfig::new(1, 1.0), &mut rng),
            Err(Error::Topology(floodmax_topology::Error::TooFewNodes(1)))
        ));
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let config = SimulationConfig::new(50, 3.0).with_seed(1234);
        let a = Simulation::from_config(config.clone()).unwrap();
        let b = Simulation::from_config(config).unwrap();

        assert_eq!(a.values(), b.values());
        assert_eq!(a.world().edges(), b.world().edges());
        assert!(a.values().iter().all(|&v| v < 1000));
    }

    #[test]
    fn entropy_seed_is_recorded() {
        let sim = Simulation::from_config(SimulationConfig::new(5, 1.0)).unwrap();
        assert!(sim.config().seed.is_some());
    }

    #[tokio::test]
    async fn path_converges_to_nine() {
        let world = World::from_edges(4, &[(0, 1), (1, 2), (2, 3)]).unwrap();
        let sim = Simulation::with_values(world, vec![3, 7, 2, 9], fast()).unwrap();

        let outcome = sim.run().await.unwrap();
        assert_eq!(outcome.convergence.max, 9);
        assert!(outcome.workers.iter().all(|w| w.max == 9));
        assert_eq!(
            outcome.workers.iter().map(|w| w.value).collect::<Vec<_>>(),
            vec![3, 7, 2, 9]
        );
    }

    #[tokio::test]
    async fn generated_graph_finds_true_maxima() {
        let config = fast().with_seed(77);
        let sim = Simulation::from_config(SimulationConfig {
            node_count: 200,
            ..config
        })
        .unwrap();
        let expected = sim.expected();

        let outcome = sim.run().await.unwrap();
        assert_eq!(outcome.convergence.groups, expected);
        assert!(outcome.messages_sent() > 0);
    }

    #[tokio::test]
    async fn global_scope_times_out_on_split_graph() {
        let world = World::from_edges(4, &[(0, 1), (2, 3)]).unwrap();
        let config = fast()
            .with_scope(ConvergenceScope::Global)
            .with_max_polls(10);
        let sim = Simulation::with_values(world, vec![5, 5, 8, 8], config).unwrap();

        assert!(matches!(
            sim.run().await,
            Err(Error::NotConverged { polls: 10, .. })
        ));
    }
}
