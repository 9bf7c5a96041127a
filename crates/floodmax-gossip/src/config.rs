//! Simulation configuration.

use std::time::Duration;

use floodmax_topology::GraphConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::monitor::{ConvergenceScope, MonitorConfig};

/// Everything needed to generate a graph and run flooding over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of nodes
    pub node_count: usize,
    /// Expected neighbors per node
    pub degree: f64,
    /// Draw random edge weights
    pub weighted: bool,
    /// Seeds are drawn from `[0, max_value)`
    pub max_value: u64,
    /// Messages each link can buffer. Defaults to the node count.
    pub link_capacity: Option<usize>,
    /// How often the monitor polls reports
    #[serde(rename = "poll_ms", with = "millis")]
    pub poll_interval: Duration,
    /// Stop after this many monitor polls
    pub max_polls: Option<u64>,
    /// Stop after this much wall-clock time
    #[serde(rename = "timeout_secs", with = "optional_secs")]
    pub timeout: Option<Duration>,
    pub scope: ConvergenceScope,
    /// RNG seed. Drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Delay before retrying a send that hit a full link
    #[serde(rename = "retry_backoff_ms", with = "millis")]
    pub retry_backoff: Duration,
}

/// Durations in config files are whole milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Optional durations in config files are whole seconds.
mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            node_count: 1000,
            degree: 3.0,
            weighted: false,
            max_value: 1000,
            link_capacity: None,
            poll_interval: Duration::from_secs(5),
            max_polls: None,
            timeout: None,
            scope: ConvergenceScope::PerComponent,
            seed: None,
            retry_backoff: Duration::from_millis(1),
        }
    }
}

impl SimulationConfig {
    /// Create a config for `node_count` nodes with expected degree `degree`.
    pub fn new(node_count: usize, degree: f64) -> Self {
        Self {
            node_count,
            degree,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    #[must_use]
    pub fn with_max_value(mut self, max_value: u64) -> Self {
        self.max_value = max_value;
        self
    }

    #[must_use]
    pub fn with_link_capacity(mut self, capacity: usize) -> Self {
        self.link_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_polls(mut self, polls: u64) -> Self {
        self.max_polls = Some(polls);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: ConvergenceScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Graph generator parameters.
    pub fn graph(&self) -> GraphConfig {
        GraphConfig::new(self.node_count, self.degree).weighted(self.weighted)
    }

    /// Monitor schedule and budget.
    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: self.poll_interval,
            max_polls: self.max_polls,
            timeout: self.timeout,
            scope: self.scope,
        }
    }

    /// Link capacity for a world of `nodes` nodes.
    pub fn link_capacity_for(&self, nodes: usize) -> usize {
        self.link_capacity.unwrap_or(nodes).max(1)
    }

    /// Check the run parameters. Graph parameters are checked by the
    /// generator.
    pub fn validate(&self) -> Result<()> {
        if self.max_value == 0 {
            return Err(Error::InvalidConfig("max_value must be at least 1".into()));
        }
        if self.link_capacity == Some(0) {
            return Err(Error::InvalidConfig("link capacity must be at least 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll interval must be positive".into()));
        }
        if self.retry_backoff.is_zero() {
            return Err(Error::InvalidConfig("retry backoff must be positive".into()));
        }
        if self.max_polls == Some(0) {
            return Err(Error::InvalidConfig("max_polls must be at least 1".into()));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidConfig("timeout must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = SimulationConfig::default();
        assert_eq!(config.node_count, 1000);
        assert_eq!(config.degree, 3.0);
        assert_eq!(config.max_value, 1000);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.link_capacity_for(1000), 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let config = SimulationConfig::new(10, 2.0)
            .with_link_capacity(3)
            .with_scope(ConvergenceScope::Global)
            .with_max_polls(4)
            .with_seed(9);

        assert_eq!(config.link_capacity_for(10), 3);
        assert_eq!(config.monitor().max_polls, Some(4));
        assert_eq!(config.monitor().scope, ConvergenceScope::Global);
        assert_eq!(config.graph().node_count, 10);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn rejects_zero_values() {
        let bad = [
            SimulationConfig::default().with_max_value(0),
            SimulationConfig::default().with_link_capacity(0),
            SimulationConfig::default().with_poll_interval(Duration::ZERO),
            SimulationConfig::default().with_retry_backoff(Duration::ZERO),
            SimulationConfig::default().with_max_polls(0),
            SimulationConfig::default().with_timeout(Duration::ZERO),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn deserializes_partial_json() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"node_count": 12, "scope": "global"}"#).unwrap();
        assert_eq!(config.node_count, 12);
        assert_eq!(config.scope, ConvergenceScope::Global);
        assert_eq!(config.degree, 3.0);
    }

    #[test]
    fn durations_use_readable_keys() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{"poll_ms": 50, "timeout_secs": 2, "retry_backoff_ms": 3}"#,
        )
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.retry_backoff, Duration::from_millis(3));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["poll_ms"], 50);
        assert_eq!(json["timeout_secs"], 2);
        assert_eq!(json["retry_backoff_ms"], 3);
        assert_eq!(serde_json::from_value::<SimulationConfig>(json).unwrap(), config);
    }
}
