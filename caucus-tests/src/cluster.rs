//! Reusable cluster harness for scenario tests.
//!
//! Wraps a spawned [`Driver`] with polling helpers. All waiting goes through
//! `tokio::time`, so under a paused test clock the helpers advance virtual
//! time instead of sleeping for real.

use std::time::Duration;

use caucus_core::NodeId;
use caucus_election::Role;
use caucus_sim::{Driver, SimConfig};

/// Poll step for the wait helpers; matches the node tick period.
const POLL_STEP: Duration = Duration::from_millis(100);

/// A running cluster under test.
pub struct TestCluster {
    driver: Driver,
}

impl TestCluster {
    /// Spawns a cluster with default protocol timing and the given seed.
    #[must_use]
    pub fn start(node_count: usize, seed: u64) -> Self {
        Self::start_with_config(&SimConfig::new(node_count).with_base_seed(seed))
    }

    /// Spawns a cluster from an explicit configuration.
    #[must_use]
    pub fn start_with_config(config: &SimConfig) -> Self {
        let driver = Driver::new(config);
        driver.spawn();
        Self { driver }
    }

    /// Returns the underlying driver.
    #[must_use]
    pub const fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Crashes a node.
    ///
    /// # Panics
    /// Panics if the id is unknown.
    pub fn crash(&self, id: u64) {
        self.driver
            .fault_injector()
            .crash(NodeId::new(id))
            .expect("crash known node");
    }

    /// Recovers a node.
    ///
    /// # Panics
    /// Panics if the id is unknown.
    pub fn recover(&self, id: u64) {
        self.driver
            .fault_injector()
            .recover(NodeId::new(id))
            .expect("recover known node");
    }

    /// Returns the current role of a node, or `None` if it is crashed.
    #[must_use]
    pub fn role_of(&self, id: u64) -> Option<Role> {
        self.driver
            .status()
            .into_iter()
            .find(|s| s.id == NodeId::new(id))
            .and_then(|s| s.role)
    }

    /// Returns the candidate a node has committed its vote to.
    #[must_use]
    pub fn voted_for(&self, id: u64) -> Option<NodeId> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.driver.nodes().get(i))
            .and_then(|handle| handle.voted_for())
    }

    /// Returns the ids of currently-working leaders.
    #[must_use]
    pub fn working_leaders(&self) -> Vec<NodeId> {
        self.driver
            .status()
            .into_iter()
            .filter(|s| s.role == Some(Role::Leader))
            .map(|s| s.id)
            .collect()
    }

    /// Advances virtual time without asserting anything.
    pub async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Polls until the predicate holds, stepping virtual time. Returns true
    /// if it held within the timeout.
    pub async fn wait_until<F>(&self, timeout: Duration, mut predicate: F) -> bool
    where
        F: FnMut(&Self) -> bool,
    {
        let mut waited = Duration::ZERO;
        loop {
            if predicate(self) {
                return true;
            }
            if waited >= timeout {
                return false;
            }
            tokio::time::sleep(POLL_STEP).await;
            waited += POLL_STEP;
        }
    }

    /// Waits until exactly one working node is leader; returns its id.
    pub async fn wait_for_single_leader(&self, timeout: Duration) -> Option<NodeId> {
        let converged = self
            .wait_until(timeout, |c| c.working_leaders().len() == 1)
            .await;
        if converged {
            self.working_leaders().first().copied()
        } else {
            None
        }
    }
}
