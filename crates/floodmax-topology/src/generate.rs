//! Random graph generation (Erdős–Rényi style).
//!
//! Every unordered pair of distinct nodes is sampled exactly once, with
//! edge probability `p = degree / (node_count - 1)`, so each node has
//! `degree` neighbors in expectation.
//!
//! The random source is always supplied by the caller. Seed it from
//! entropy for a fresh graph per run, or from a fixed seed to reproduce one.

use rand::Rng;
use tracing::info;

use crate::error::{Error, Result};
use crate::world::{Edge, NodeId, World};

/// Exclusive upper bound on generated edge weights.
pub const MAX_WEIGHT: u32 = 100;

/// Parameters for [`generate`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphConfig {
    /// Number of nodes, at least 2
    pub node_count: usize,
    /// Expected number of neighbors per node
    pub degree: f64,
    /// Draw weights in `[0, MAX_WEIGHT)` instead of fixing them at 1
    pub weighted: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            node_count: 1000,
            degree: 3.0,
            weighted: false,
        }
    }
}

impl GraphConfig {
    pub fn new(node_count: usize, degree: f64) -> Self {
        Self {
            node_count,
            degree,
            weighted: false,
        }
    }

    #[must_use]
    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    /// Edge probability implied by this configuration.
    ///
    /// Fails for fewer than two nodes, a negative or non-finite degree, or
    /// a degree that would need a probability above 1.
    pub fn edge_probability(&self) -> Result<f64> {
        if self.node_count <= 1 {
            return Err(Error::TooFewNodes(self.node_count));
        }
        if !self.degree.is_finite() || self.degree < 0.0 {
            return Err(Error::InvalidDegree(self.degree));
        }

        let probability = self.degree / (self.node_count - 1) as f64;
        if probability > 1.0 {
            return Err(Error::ProbabilityOutOfRange {
                degree: self.degree,
                nodes: self.node_count,
                probability,
            });
        }
        Ok(probability)
    }
}

/// Generate a random undirected graph.
pub fn generate<R: Rng + ?Sized>(config: &GraphConfig, rng: &mut R) -> Result<World> {
    let probability = config.edge_probability()?;
    info!(
        nodes = config.node_count,
        degree = config.degree,
        probability,
        "Generating graph"
    );

    let mut world = World::with_nodes(config.node_count);
    for i in 0..config.node_count {
        for j in (i + 1)..config.node_count {
            if rng.gen::<f64>() < probability {
                let weight = if config.weighted {
                    rng.gen_range(0..MAX_WEIGHT)
                } else {
                    1
                };
                world.add_edge(Edge::undirected(NodeId(i), NodeId(j), weight))?;
            }
        }
    }

    info!(
        edges = world.edge_count(),
        mean_degree = world.mean_degree(),
        "Graph generated"
    );
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn rejects_too_few_nodes() {
        let mut rng = StdRng::seed_from_u64(1);
        for n in [0, 1] {
            assert_eq!(
                generate(&GraphConfig::new(n, 1.0), &mut rng).unwrap_err(),
                Error::TooFewNodes(n)
            );
        }
    }

    #[test]
    fn rejects_bad_degree() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            generate(&GraphConfig::new(10, -1.0), &mut rng),
            Err(Error::InvalidDegree(_))
        ));
        assert!(matches!(
            generate(&GraphConfig::new(10, f64::NAN), &mut rng),
            Err(Error::InvalidDegree(_))
        ));
        assert!(matches!(
            generate(&GraphConfig::new(10, 9.5), &mut rng),
            Err(Error::ProbabilityOutOfRange { nodes: 10, .. })
        ));
    }

    #[test]
    fn zero_degree_has_no_edges() {
        let mut rng = StdRng::seed_from_u64(7);
        let world = generate(&GraphConfig::new(50, 0.0), &mut rng).unwrap();
        assert_eq!(world.node_count(), 50);
        assert_eq!(world.edge_count(), 0);
    }

    #[test]
    fn full_degree_is_complete() {
        let mut rng = StdRng::seed_from_u64(7);
        let world = generate(&GraphConfig::new(12, 11.0), &mut rng).unwrap();
        assert_eq!(world.edge_count(), 12 * 11 / 2);
        assert!(world.is_connected());
    }

    #[test]
    fn same_seed_same_graph() {
        let config = GraphConfig::new(40, 3.0).weighted(true);
        let a = generate(&config, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = generate(&config, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a.edges(), b.edges());
    }

    #[test]
    fn weights_follow_flag() {
        let unweighted = generate(&GraphConfig::new(30, 5.0), &mut StdRng::seed_from_u64(3)).unwrap();
        assert!(unweighted.edges().iter().all(|e| e.weight == 1));

        let weighted = generate(
            &GraphConfig::new(30, 5.0).weighted(true),
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();
        assert!(weighted.edges().iter().all(|e| e.weight < MAX_WEIGHT));
        assert!(weighted.edges().iter().all(|e| !e.directed));
    }

    #[test]
    fn mean_degree_near_target() {
        let world = generate(&GraphConfig::new(1000, 3.0), &mut StdRng::seed_from_u64(11)).unwrap();
        let mean = world.mean_degree();
        assert!((2.7..3.3).contains(&mean), "mean degree {mean}");
    }

    proptest! {
        #[test]
        fn generated_edges_hold_invariants(
            nodes in 2usize..60,
            degree_frac in 0.0f64..=1.0,
            seed in any::<u64>(),
        ) {
            let degree = degree_frac * (nodes - 1) as f64;
            let world = generate(&GraphConfig::new(nodes, degree), &mut StdRng::seed_from_u64(seed)).unwrap();

            prop_assert_eq!(world.node_count(), nodes);
            let mut pairs = HashSet::new();
            for edge in world.edges() {
                prop_assert_ne!(edge.from, edge.to);
                prop_assert!(world.contains(edge.from) && world.contains(edge.to));
                let key = (edge.from.min(edge.to), edge.from.max(edge.to));
                prop_assert!(pairs.insert(key), "duplicate edge {:?}", key);
            }
            prop_assert!(world.validate().is_ok());
        }
    }
}
