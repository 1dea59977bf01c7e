//! Parser for the engine's free-text cluster-status report.
//!
//! The report is a loosely structured line protocol, so this is a tolerant
//! line-oriented parser rather than a strict grammar: unknown lines are
//! ignored, unrecognized server-table rows are skipped with a warning, and
//! only the fields reconciliation actually depends on are required.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::error::ParseError;
use crate::types::{ClusterStatus, PeerEntry, PeerLiveness, RaftRole};

static SERVER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Server ID: [0-9a-f]{4} \(([0-9a-f-]+)\)$").unwrap());

static ADDRESS_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Address: (.+)$").unwrap());

static ROLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^Role: (\S+)$").unwrap());

static TERM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^Term: (\S+)$").unwrap());

static TIMER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Election timer: (\S+)$").unwrap());

// e.g. `    87f0 (87f0 at ssl:10.1.1.185:9643) (self)`
//      `    bbf6 (bbf6 at ssl:10.1.1.218:9643) last msg 2757 ms ago`
static PEER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9a-f]{4}) \([0-9a-f]{4} at (\S+)\)(?: \((self)\)| last msg ([0-9]+) ms ago)\s*$")
        .unwrap()
});

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(ssl|tcp|unix):\S+:[0-9]+$").unwrap());

/// Whether an address has the `scheme:host:port` shape the raft transport
/// uses. Anything else is a parse failure, never a silent default.
pub fn is_valid_address(addr: &str) -> bool {
    ADDRESS_RE.is_match(addr)
}

/// Parse one raw cluster-status report into a structured snapshot.
pub fn parse_cluster_status(raw: &str) -> Result<ClusterStatus, ParseError> {
    let server_id = SERVER_ID_RE
        .captures(raw)
        .map(|c| c[1].to_string())
        .ok_or(ParseError::MissingField("Server ID"))?;

    let address = ADDRESS_LINE_RE
        .captures(raw)
        .map(|c| c[1].trim().to_string())
        .ok_or(ParseError::MissingField("Address"))?;
    if !is_valid_address(&address) {
        return Err(ParseError::Address(address));
    }

    let role: RaftRole = ROLE_RE
        .captures(raw)
        .map(|c| c[1].to_string())
        .ok_or(ParseError::MissingField("Role"))?
        .parse()?;

    let term_raw = TERM_RE
        .captures(raw)
        .map(|c| c[1].to_string())
        .ok_or(ParseError::MissingField("Term"))?;
    let term: u64 = term_raw.parse().map_err(|_| ParseError::Term(term_raw))?;

    let timer_raw = TIMER_RE
        .captures(raw)
        .map(|c| c[1].to_string())
        .ok_or(ParseError::MissingField("Election timer"))?;
    let election_timer: i64 = timer_raw
        .parse()
        .map_err(|_| ParseError::ElectionTimer(timer_raw))?;

    let peers = parse_server_table(raw)?;

    if peers.iter().filter(|p| p.is_self()).count() != 1 {
        return Err(ParseError::NoSelfEntry);
    }
    // Tolerated skew: while the local identity is being regenerated the
    // table's self entry can briefly disagree with the report header.
    if let Some(local) = peers.iter().find(|p| p.is_self()) {
        if !server_id.starts_with(&local.short_id) {
            warn!(
                "self entry {} is not a prefix of server id {}",
                local.short_id, server_id
            );
        }
    }

    Ok(ClusterStatus {
        server_id,
        address,
        role,
        term,
        election_timer,
        peers,
    })
}

fn parse_server_table(raw: &str) -> Result<Vec<PeerEntry>, ParseError> {
    let mut peers: Vec<PeerEntry> = Vec::new();
    let mut in_servers = false;

    for line in raw.lines() {
        if !in_servers {
            if line.trim_end() == "Servers:" {
                in_servers = true;
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let Some(caps) = PEER_RE.captures(line) else {
            warn!("skipping unrecognized server table line: {}", line.trim());
            continue;
        };

        let short_id = caps[1].to_string();
        let peer_address = caps[2].to_string();
        if !is_valid_address(&peer_address) {
            warn!(
                "skipping server {} with malformed address {}",
                short_id, peer_address
            );
            continue;
        }
        // Short ids are unique per report; keep the first occurrence.
        if peers.iter().any(|p| p.short_id == short_id) {
            warn!("duplicate server id {} in server table", short_id);
            continue;
        }

        let liveness = if caps.get(3).is_some() {
            PeerLiveness::Local
        } else {
            match caps[4].parse::<u64>() {
                Ok(ms) => PeerLiveness::LastMsgMs(ms),
                Err(_) => {
                    warn!("skipping server {} with unparsable last-msg age", short_id);
                    continue;
                }
            }
        };

        peers.push(PeerEntry {
            short_id,
            address: peer_address,
            liveness,
        });
    }

    if !in_servers {
        return Err(ParseError::MissingField("Servers"));
    }
    Ok(peers)
}
