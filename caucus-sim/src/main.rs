//! Caucus leader-election simulator binary.
//!
//! Starts N nodes, lets them elect a leader, and reads fault-injection
//! commands from stdin:
//!
//! ```bash
//! caucus-sim --nodes 5
//! > state
//! > crash 0
//! > recover 0
//! > quit
//! ```
//!
//! The simulation runs until `quit`; leaders that crash are replaced by a
//! fresh election among the survivors.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::time::Duration;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use caucus_sim::{Driver, SimConfig, USAGE};

/// Randomized leader-election simulator.
#[derive(Parser, Debug)]
#[command(name = "caucus-sim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of simulated nodes.
    #[arg(long, default_value = "5")]
    nodes: usize,

    /// Base RNG seed; each node's jitter seed is `seed ^ node_id`.
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Follower election timeout in milliseconds.
    #[arg(long, default_value = "1000")]
    election_timeout_ms: u64,

    /// Leader heartbeat interval in milliseconds.
    #[arg(long, default_value = "500")]
    heartbeat_interval_ms: u64,

    /// Candidate voting window in milliseconds.
    #[arg(long, default_value = "2000")]
    voting_window_ms: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logging goes to stderr so the command loop owns stdout.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(
        nodes = args.nodes,
        seed = args.seed,
        "starting caucus simulator"
    );

    let config = SimConfig::new(args.nodes)
        .with_base_seed(args.seed)
        .with_timing(
            Duration::from_millis(args.election_timeout_ms),
            Duration::from_millis(args.heartbeat_interval_ms),
            Duration::from_millis(args.voting_window_ms),
        );

    let driver = Driver::new(&config);
    driver.spawn();

    println!("{USAGE}");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    driver.run_repl(stdin).await?;

    info!("simulator exiting");
    Ok(())
}
