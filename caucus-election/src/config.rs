//! Election configuration.

use std::time::Duration;

use caucus_core::NodeId;

use crate::limits::{
    CANDIDACY_DELAY_MAX, CANDIDACY_DELAY_MIN, CLUSTER_SIZE_MAX, ELECTION_TIMEOUT,
    HEARTBEAT_INTERVAL, VOTING_WINDOW,
};

/// Configuration for one election node.
#[derive(Debug, Clone)]
pub struct ElectionConfig {
    /// This node's ID.
    pub node_id: NodeId,

    /// IDs of all nodes in the cluster (including this one).
    pub cluster: Vec<NodeId>,

    /// Follower timeout: no accepted heartbeat for this long starts an
    /// election attempt.
    pub election_timeout: Duration,

    /// Leader broadcast cadence.
    pub heartbeat_interval: Duration,

    /// How long a candidate collects votes before tallying.
    pub voting_window: Duration,

    /// Lower bound of the randomized pre-candidacy delay.
    pub candidacy_delay_min: Duration,

    /// Upper bound of the randomized pre-candidacy delay.
    pub candidacy_delay_max: Duration,

    /// Seed for the node's RNG (candidacy jitter). Defaults to the node id;
    /// drivers mix in a base seed for varied but reproducible runs.
    pub seed: u64,
}

impl ElectionConfig {
    /// Creates a configuration with default timing.
    ///
    /// # Panics
    /// Panics if the cluster is empty or too large, or if this node is not
    /// in the cluster.
    #[must_use]
    pub fn new(node_id: NodeId, cluster: Vec<NodeId>) -> Self {
        assert!(!cluster.is_empty(), "cluster cannot be empty");
        assert!(
            cluster.len() <= CLUSTER_SIZE_MAX,
            "cluster size {} exceeds maximum {}",
            cluster.len(),
            CLUSTER_SIZE_MAX
        );
        assert!(cluster.contains(&node_id), "node_id must be in cluster");

        Self {
            node_id,
            cluster,
            election_timeout: ELECTION_TIMEOUT,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            voting_window: VOTING_WINDOW,
            candidacy_delay_min: CANDIDACY_DELAY_MIN,
            candidacy_delay_max: CANDIDACY_DELAY_MAX,
            seed: node_id.get(),
        }
    }

    /// Returns the number of nodes in the cluster.
    #[must_use]
    pub fn cluster_size(&self) -> usize {
        self.cluster.len()
    }

    /// Returns the other nodes in the cluster (excluding this node).
    #[must_use]
    pub fn peers(&self) -> Vec<NodeId> {
        self.cluster
            .iter()
            .copied()
            .filter(|&id| id != self.node_id)
            .collect()
    }

    /// Sets custom protocol timing.
    ///
    /// # Panics
    /// Panics if the heartbeat interval is not shorter than the election
    /// timeout.
    #[must_use]
    pub fn with_timing(
        mut self,
        election_timeout: Duration,
        heartbeat_interval: Duration,
        voting_window: Duration,
    ) -> Self {
        assert!(
            heartbeat_interval < election_timeout,
            "heartbeat interval must be shorter than election timeout"
        );

        self.election_timeout = election_timeout;
        self.heartbeat_interval = heartbeat_interval;
        self.voting_window = voting_window;
        self
    }

    /// Sets a custom pre-candidacy delay range.
    ///
    /// # Panics
    /// Panics if min > max.
    #[must_use]
    pub fn with_candidacy_delay(mut self, min: Duration, max: Duration) -> Self {
        assert!(min <= max, "delay min must be <= max");

        self.candidacy_delay_min = min;
        self.candidacy_delay_max = max;
        self
    }

    /// Sets the RNG seed for candidacy jitter.
    #[must_use]
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> caucus_core::Result<()> {
        if self.cluster.is_empty() {
            return Err(caucus_core::Error::InvalidArgument {
                name: "cluster",
                reason: "cannot be empty",
            });
        }
        if self.cluster.len() > CLUSTER_SIZE_MAX {
            return Err(caucus_core::Error::InvalidArgument {
                name: "cluster",
                reason: "too large",
            });
        }
        if !self.cluster.contains(&self.node_id) {
            return Err(caucus_core::Error::InvalidArgument {
                name: "node_id",
                reason: "not in cluster",
            });
        }
        if self.heartbeat_interval >= self.election_timeout {
            return Err(caucus_core::Error::InvalidArgument {
                name: "heartbeat_interval",
                reason: "must be shorter than election timeout",
            });
        }
        if self.voting_window.is_zero() {
            return Err(caucus_core::Error::InvalidArgument {
                name: "voting_window",
                reason: "must be positive",
            });
        }
        if self.candidacy_delay_min > self.candidacy_delay_max {
            return Err(caucus_core::Error::InvalidArgument {
                name: "candidacy_delay_min",
                reason: "must be <= candidacy_delay_max",
            });
        }
        Ok(())
    }
}
