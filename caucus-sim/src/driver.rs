//! Cluster assembly and the interactive command surface.
//!
//! The driver owns the bus and the node set, spawns each node's tick loop,
//! and runs the line-oriented command loop (`state`, `crash <id>`,
//! `recover <id>`, `quit`). It only ever reads node state for reporting;
//! all mutation goes through the fault injector.

use std::sync::Arc;
use std::time::Duration;

use caucus_core::NodeId;
use caucus_election::{limits, ElectionConfig, ElectionNode, Role};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

use crate::bus::MessageBus;
use crate::fault::FaultInjector;
use crate::runtime::{sim_now, spawn_node, NodeHandle};

/// One-line summary of the command surface.
pub const USAGE: &str = "commands: state | crash <id> | recover <id> | quit";

/// Construction-time configuration for a simulated cluster.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of nodes. Fixed for the lifetime of the simulation.
    pub node_count: usize,
    /// Base RNG seed; each node's jitter seed is `base_seed ^ node_id`.
    pub base_seed: u64,
    /// Follower election timeout.
    pub election_timeout: Duration,
    /// Leader heartbeat cadence.
    pub heartbeat_interval: Duration,
    /// Candidate vote-collection window.
    pub voting_window: Duration,
    /// Lower bound of the candidacy jitter.
    pub candidacy_delay_min: Duration,
    /// Upper bound of the candidacy jitter.
    pub candidacy_delay_max: Duration,
}

impl SimConfig {
    /// Creates a configuration with the protocol's default timing.
    #[must_use]
    pub const fn new(node_count: usize) -> Self {
        Self {
            node_count,
            base_seed: 0,
            election_timeout: limits::ELECTION_TIMEOUT,
            heartbeat_interval: limits::HEARTBEAT_INTERVAL,
            voting_window: limits::VOTING_WINDOW,
            candidacy_delay_min: limits::CANDIDACY_DELAY_MIN,
            candidacy_delay_max: limits::CANDIDACY_DELAY_MAX,
        }
    }

    /// Sets the base RNG seed.
    #[must_use]
    pub fn with_base_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    /// Sets custom protocol timing.
    #[must_use]
    pub fn with_timing(
        mut self,
        election_timeout: Duration,
        heartbeat_interval: Duration,
        voting_window: Duration,
    ) -> Self {
        self.election_timeout = election_timeout;
        self.heartbeat_interval = heartbeat_interval;
        self.voting_window = voting_window;
        self
    }

    /// Sets a custom candidacy jitter range.
    #[must_use]
    pub fn with_candidacy_delay(mut self, min: Duration, max: Duration) -> Self {
        self.candidacy_delay_min = min;
        self.candidacy_delay_max = max;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

/// A point-in-time view of one node, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStatus {
    /// The node's id.
    pub id: NodeId,
    /// The node's role, or `None` if it is crashed.
    pub role: Option<Role>,
}

/// Owns the cluster: bus, nodes, and the fault injector.
#[derive(Debug)]
pub struct Driver {
    bus: Arc<MessageBus>,
    nodes: Vec<NodeHandle>,
    injector: FaultInjector,
}

impl Driver {
    /// Builds a cluster from the configuration. Nodes are created but not
    /// yet running; call [`Driver::spawn`] to start them.
    ///
    /// # Panics
    /// Panics if the node count is zero or exceeds the cluster size limit.
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        assert!(config.node_count > 0, "node count must be positive");

        let node_count = u64::try_from(config.node_count).unwrap_or(u64::MAX);
        let cluster: Vec<NodeId> = (0..node_count).map(NodeId::new).collect();
        let bus = Arc::new(MessageBus::new(config.node_count));

        let now = sim_now();
        let nodes: Vec<NodeHandle> = cluster
            .iter()
            .map(|&id| {
                let election = ElectionConfig::new(id, cluster.clone())
                    .with_timing(
                        config.election_timeout,
                        config.heartbeat_interval,
                        config.voting_window,
                    )
                    .with_candidacy_delay(config.candidacy_delay_min, config.candidacy_delay_max)
                    .with_random_seed(config.base_seed ^ id.get());
                NodeHandle::new(id, ElectionNode::new(election, now))
            })
            .collect();

        let injector = FaultInjector::new(Arc::clone(&bus), nodes.clone());

        Self {
            bus,
            nodes,
            injector,
        }
    }

    /// Starts every node's tick loop. The loops run detached until the
    /// process (or the owning runtime) shuts down.
    pub fn spawn(&self) {
        for handle in &self.nodes {
            spawn_node(handle.clone(), Arc::clone(&self.bus));
        }
        info!(nodes = self.nodes.len(), "cluster running");
    }

    /// Returns the fault injector for this cluster.
    #[must_use]
    pub const fn fault_injector(&self) -> &FaultInjector {
        &self.injector
    }

    /// Returns the message bus.
    #[must_use]
    pub const fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Returns the node handles, indexed by node id.
    #[must_use]
    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    /// Returns a point-in-time view of every node.
    #[must_use]
    pub fn status(&self) -> Vec<NodeStatus> {
        self.nodes
            .iter()
            .map(|handle| NodeStatus {
                id: handle.id,
                role: self.bus.is_working(handle.id).then(|| handle.role()),
            })
            .collect()
    }

    /// Runs the interactive command loop until `quit`/`exit` or EOF.
    ///
    /// Bad commands and unknown ids print an error plus usage and continue;
    /// nothing here is fatal.
    ///
    /// # Errors
    /// Returns an error only if reading the input fails.
    pub async fn run_repl<R>(&self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Ok(Command::State) => {
                    for status in self.status() {
                        match status.role {
                            Some(role) => println!("node {}: {role}", status.id.get()),
                            None => println!("node {}: crashed", status.id.get()),
                        }
                    }
                }
                Ok(Command::Crash(id)) => {
                    if let Err(e) = self.injector.crash(id) {
                        println!("error: {e}");
                    }
                }
                Ok(Command::Recover(id)) => {
                    if let Err(e) = self.injector.recover(id) {
                        println!("error: {e}");
                    }
                }
                Ok(Command::Quit) => break,
                Err(e) => {
                    println!("error: {e}");
                    println!("{USAGE}");
                }
            }
        }

        Ok(())
    }
}

/// A parsed driver command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print each node's id and role.
    State,
    /// Crash a node.
    Crash(NodeId),
    /// Recover a node.
    Recover(NodeId),
    /// Leave the command loop.
    Quit,
}

impl Command {
    /// Parses one input line.
    ///
    /// # Errors
    /// Returns a [`CommandError`] for empty input, unknown commands, and
    /// missing or non-numeric node ids.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Err(CommandError::Empty);
        };

        match command {
            "state" => Ok(Self::State),
            "crash" => parse_node_id("crash", parts.next()).map(Self::Crash),
            "recover" => parse_node_id("recover", parts.next()).map(Self::Recover),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}

/// Parses the node-id argument of `crash`/`recover`.
fn parse_node_id(command: &'static str, arg: Option<&str>) -> Result<NodeId, CommandError> {
    let arg = arg.ok_or(CommandError::MissingNodeId { command })?;
    arg.parse::<u64>()
        .map(NodeId::new)
        .map_err(|_| CommandError::InvalidNodeId(arg.to_string()))
}

/// Command parse errors. Reported to the user; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The input line was empty.
    #[error("empty command")]
    Empty,

    /// The command word was not recognized.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// `crash`/`recover` without a node id.
    #[error("'{command}' requires a node id")]
    MissingNodeId {
        /// The command that was missing its argument.
        command: &'static str,
    },

    /// The node id was not a number.
    #[error("invalid node id '{0}'")]
    InvalidNodeId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert_eq!(Command::parse("state"), Ok(Command::State));
        assert_eq!(Command::parse("  state  "), Ok(Command::State));
    }

    #[test]
    fn test_parse_crash_and_recover() {
        assert_eq!(Command::parse("crash 2"), Ok(Command::Crash(NodeId::new(2))));
        assert_eq!(
            Command::parse("recover 0"),
            Ok(Command::Recover(NodeId::new(0)))
        );
    }

    #[test]
    fn test_parse_quit_aliases() {
        assert_eq!(Command::parse("quit"), Ok(Command::Quit));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_missing_id() {
        assert_eq!(
            Command::parse("crash"),
            Err(CommandError::MissingNodeId { command: "crash" })
        );
    }

    #[test]
    fn test_parse_bad_id() {
        assert_eq!(
            Command::parse("recover two"),
            Err(CommandError::InvalidNodeId("two".to_string()))
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            Command::parse("reboot 1"),
            Err(CommandError::UnknownCommand("reboot".to_string()))
        );
    }

    #[tokio::test]
    async fn test_new_cluster_all_followers() {
        let driver = Driver::new(&SimConfig::new(3));

        let status = driver.status();
        assert_eq!(status.len(), 3);
        for (i, node) in status.iter().enumerate() {
            assert_eq!(node.id, NodeId::new(i as u64));
            assert_eq!(node.role, Some(Role::Follower));
        }
    }

    #[tokio::test]
    async fn test_status_reports_crashed_nodes() {
        let driver = Driver::new(&SimConfig::new(3));

        driver.fault_injector().crash(NodeId::new(1)).expect("crash");

        let status = driver.status();
        assert_eq!(status[1].role, None);
        assert_eq!(status[0].role, Some(Role::Follower));
    }

    #[tokio::test]
    async fn test_repl_executes_commands_until_quit() {
        let driver = Driver::new(&SimConfig::new(3));

        let input = tokio::io::BufReader::new(&b"crash 1\nbogus\ncrash 9\nquit\nstate\n"[..]);
        driver.run_repl(input).await.expect("repl");

        // The crash before quit took effect; nothing after quit ran.
        assert!(!driver.bus().is_working(NodeId::new(1)));
        assert!(driver.bus().is_working(NodeId::new(0)));
    }
}
