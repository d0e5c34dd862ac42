//! Protocol limits and timing defaults.
//!
//! Every timing parameter has an explicit default here; `ElectionConfig`
//! starts from these and tests override them for faster rounds.

use std::time::Duration;

/// Maximum number of nodes in a simulated cluster.
pub const CLUSTER_SIZE_MAX: usize = 16;

/// How long a follower waits without an accepted heartbeat before it starts
/// an election attempt.
pub const ELECTION_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Leader broadcast cadence. Must stay below [`ELECTION_TIMEOUT`] or
/// followers time out between heartbeats.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// How long a candidate collects votes before tallying.
pub const VOTING_WINDOW: Duration = Duration::from_millis(2_000);

/// Lower bound of the randomized pre-candidacy delay.
pub const CANDIDACY_DELAY_MIN: Duration = Duration::from_millis(1_000);

/// Upper bound of the randomized pre-candidacy delay.
pub const CANDIDACY_DELAY_MAX: Duration = Duration::from_millis(3_000);
