//! Election message types.
//!
//! Messages are plain values, immutable once sent. They carry node ids only;
//! there are no terms, no payloads, and no addressing beyond the mailbox a
//! message is placed in.

use caucus_core::NodeId;

/// Messages exchanged between nodes during an election.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Periodic broadcast from the current leader; re-arms follower timeouts.
    Heartbeat {
        /// The leader announcing itself.
        leader: NodeId,
    },
    /// A node announcing it is standing for election.
    Candidacy {
        /// The node standing for election.
        candidate: NodeId,
    },
    /// A vote cast in response to a candidacy.
    Vote {
        /// The node casting the vote.
        voter: NodeId,
        /// The candidate the vote is for.
        candidate: NodeId,
    },
}

impl Message {
    /// Returns the node that originated this message.
    #[must_use]
    pub const fn from(&self) -> NodeId {
        match self {
            Self::Heartbeat { leader } => *leader,
            Self::Candidacy { candidate } => *candidate,
            Self::Vote { voter, .. } => *voter,
        }
    }
}
