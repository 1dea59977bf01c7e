use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ParseError;

/// Logical name of the northbound database instance, as used in admin verbs.
pub const DB_NORTH: &str = "Northbound";
/// Logical name of the southbound database instance.
pub const DB_SOUTH: &str = "Southbound";

/// Length of the short hex identity prefix raft uses in its server table.
pub const SHORT_ID_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaftRole {
    Leader,
    Follower,
    Candidate,
}

impl FromStr for RaftRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leader" => Ok(RaftRole::Leader),
            "follower" => Ok(RaftRole::Follower),
            "candidate" => Ok(RaftRole::Candidate),
            other => Err(ParseError::Role(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerLiveness {
    /// The entry for the local server itself.
    Local,
    /// Milliseconds since the last message from this peer.
    LastMsgMs(u64),
}

/// One row of the raft server table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub short_id: String,
    pub address: String,
    pub liveness: PeerLiveness,
}

impl PeerEntry {
    pub fn is_self(&self) -> bool {
        self.liveness == PeerLiveness::Local
    }
}

/// Structured snapshot of one cluster-status report. Rebuilt from scratch
/// every reconcile cycle; nothing here survives across cycles.
#[derive(Debug, Clone)]
pub struct ClusterStatus {
    /// Full identity of the local server.
    pub server_id: String,
    /// Network address of the local server.
    pub address: String,
    pub role: RaftRole,
    pub term: u64,
    /// Current election timer in milliseconds.
    pub election_timer: i64,
    pub peers: Vec<PeerEntry>,
}

impl ClusterStatus {
    /// The server-table entry for the local server. The parser guarantees
    /// exactly one such entry exists.
    pub fn local_peer(&self) -> Option<&PeerEntry> {
        self.peers.iter().find(|p| p.is_self())
    }

    pub fn peer_by_short_id(&self, short_id: &str) -> Option<&PeerEntry> {
        self.peers.iter().find(|p| p.short_id == short_id)
    }
}
