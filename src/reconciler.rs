//! The membership and health reconcilers for one managed database.
//!
//! Each operation is safely re-entrant: it observes the current cluster
//! status, issues at most the corrective commands that observation justifies,
//! and leaves anything that failed for re-detection on the next cycle.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::admin::AdminChannel;
use crate::config::DbSettings;
use crate::error::{ParseError, ReconcileError};
use crate::membership::MembershipSource;
use crate::status::parse_cluster_status;
use crate::types::{ClusterStatus, RaftRole, DB_NORTH, DB_SOUTH, SHORT_ID_LEN};

/// One managed database instance. Exactly two exist per agent, northbound
/// and southbound. Mutated only by its own reconcile loop.
#[derive(Clone)]
pub struct ManagedDatabase {
    /// Logical name, as used in admin verbs.
    pub name: String,
    /// Short alias used for on-disk file naming.
    pub alias: String,
    pub db_file: PathBuf,
    /// Target election timer in milliseconds.
    pub election_timer: i64,
    /// Consecutive status-query failures seen by the periodic driver.
    pub status_failures: u32,
    pub call_timeout: Duration,
    pub channel: Arc<dyn AdminChannel>,
}

impl ManagedDatabase {
    pub fn new(settings: &DbSettings, channel: Arc<dyn AdminChannel>, call_timeout: Duration) -> Self {
        Self {
            name: settings.name.clone(),
            alias: settings.alias.clone(),
            db_file: settings.db_file.clone(),
            election_timer: settings.election_timer_ms,
            status_failures: 0,
            call_timeout,
            channel,
        }
    }

    /// Query the full local server identity.
    pub async fn server_id(&self) -> Result<String, ReconcileError> {
        let args = vec!["cluster/sid".to_string(), self.name.clone()];
        let out = self
            .channel
            .execute(self.call_timeout, &args)
            .await
            .map_err(|e| ReconcileError::ServerIdQuery {
                db: self.name.clone(),
                source: e,
            })?;
        Ok(out.stdout.trim().to_string())
    }

    /// Query and parse the current cluster status.
    pub async fn cluster_status(&self) -> Result<ClusterStatus, ReconcileError> {
        let args = vec!["cluster/status".to_string(), self.name.clone()];
        let out = self
            .channel
            .execute(self.call_timeout, &args)
            .await
            .map_err(|e| ReconcileError::StatusQuery {
                db: self.name.clone(),
                source: e,
            })?;
        Ok(parse_cluster_status(&out.stdout)?)
    }

    /// Forcibly remove a member from the consensus group.
    pub async fn kick(&self, short_id: &str) -> Result<(), ReconcileError> {
        let args = vec![
            "cluster/kick".to_string(),
            self.name.clone(),
            short_id.to_string(),
        ];
        self.channel
            .execute(self.call_timeout, &args)
            .await
            .map_err(|e| ReconcileError::Kick {
                db: self.name.clone(),
                sid: short_id.to_string(),
                source: e,
            })?;
        Ok(())
    }

    pub async fn change_election_timer(&self, value: i64) -> Result<(), ReconcileError> {
        let args = vec![
            "cluster/change-election-timer".to_string(),
            self.name.clone(),
            value.to_string(),
        ];
        self.channel
            .execute(self.call_timeout, &args)
            .await
            .map_err(|e| ReconcileError::ChangeTimer {
                db: self.name.clone(),
                value,
                source: e,
            })?;
        Ok(())
    }
}

/// Evict a stale raft entry sharing the local node's address but not its
/// current server identity. Such an entry is a leftover membership record
/// from before the local identity changed, e.g. after a disaster-recovery
/// cycle regenerated a fresh identity.
///
/// Idempotent: once the entry is kicked it disappears from the next status
/// report and the scan finds nothing to do.
pub async fn ensure_local_server_id(db: &ManagedDatabase) -> Result<(), ReconcileError> {
    let sid = db.server_id().await?;
    let short_id: String = sid.chars().take(SHORT_ID_LEN).collect();
    if short_id.len() < SHORT_ID_LEN || !short_id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ReconcileError::InvalidServerId {
            db: db.name.clone(),
            sid,
        });
    }

    let status = db.cluster_status().await?;
    let local = status
        .local_peer()
        .ok_or(ReconcileError::Parse(ParseError::NoSelfEntry))?;
    if local.short_id != short_id {
        // Seen briefly while an identity regeneration is propagating.
        warn!(
            "self entry {} for {} does not match current server id {}",
            local.short_id, db.name, short_id
        );
    }

    for peer in &status.peers {
        if peer.is_self() {
            continue;
        }
        if peer.address == status.address && peer.short_id != short_id {
            info!(
                "kicking stale raft member {} at {} from {}",
                peer.short_id, peer.address, db.name
            );
            db.kick(&peer.short_id).await?;
        }
    }
    Ok(())
}

/// Evict raft entries whose address is not in the known-good member set.
///
/// Entries whose address is in the set, the self entry included, are left
/// untouched regardless of identity mismatch; identity skew is
/// [`ensure_local_server_id`]'s concern. Evictions are independent; one
/// failure does not stop the others, and all failures are returned together.
pub async fn ensure_cluster_membership(
    db: &ManagedDatabase,
    source: &dyn MembershipSource,
) -> Result<(), ReconcileError> {
    if db.name != DB_NORTH && db.name != DB_SOUTH {
        return Err(ReconcileError::InvalidDbName(db.name.clone()));
    }

    let status = db.cluster_status().await?;
    let known = source.known_members(&db.name)?;

    let mut failures = Vec::new();
    for peer in &status.peers {
        if peer.is_self() {
            continue;
        }
        if known.iter().any(|m| m == &peer.address) {
            continue;
        }
        info!(
            "kicking unknown raft member {} at {} from {}",
            peer.short_id, peer.address, db.name
        );
        if let Err(e) = db.kick(&peer.short_id).await {
            warn!("failed to kick {} from {}: {}", peer.short_id, db.name, e);
            failures.push(format!("{}: {}", peer.short_id, e));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::KickMany(failures))
    }
}

/// One bounded step of the election timer toward `target`. The consensus
/// protocol permits a single change request to at most double or halve the
/// current value.
pub fn next_election_step(current: i64, target: i64) -> i64 {
    // The engine never reports a non-positive timer, but doubling from zero
    // would stall forever; clamp so the walk can still make progress.
    let current = current.max(1);
    if target > current {
        target.min(current.saturating_mul(2))
    } else {
        target.max(current / 2)
    }
}

/// Converge the leader's election timer toward the configured target, one
/// rate-limited step per cycle. Followers never initiate the change; the
/// cluster-wide proposal must come from a single authority.
pub async fn ensure_election_timeout(db: &ManagedDatabase) -> Result<(), ReconcileError> {
    let status = db.cluster_status().await?;
    if status.role != RaftRole::Leader {
        debug!("{} is not leader, leaving election timer alone", db.name);
        return Ok(());
    }

    let current = status.election_timer;
    let target = db.election_timer;
    if current == target {
        return Ok(());
    }

    let next = next_election_step(current, target);
    info!(
        "changing election timer for {} from {} to {} (target {})",
        db.name, current, next, target
    );
    db.change_election_timer(next).await
}

/// Back up and discard the local database file, then ask the engine process
/// to exit so that its supervisor restarts it as a fresh member that
/// re-synchronizes all state from its peers.
///
/// The backup is all-or-nothing and happens before any destructive action:
/// if it fails, the original file is untouched and nothing is restarted.
/// Returns the backup file path; a restart failure still reports the backup
/// already produced.
pub async fn reset_database(db: &ManagedDatabase) -> Result<PathBuf, ReconcileError> {
    if !db.db_file.exists() {
        return Err(ReconcileError::Backup {
            file: db.db_file.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "database file not found"),
        });
    }

    let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let mut backup = db
        .db_file
        .with_file_name(format!("{}.{}.backup", db.alias, stamp));
    let mut n = 1;
    while backup.exists() {
        backup = db
            .db_file
            .with_file_name(format!("{}.{}-{}.backup", db.alias, stamp, n));
        n += 1;
    }
    // Rename is the backup and the discard in one atomic step; the restarted
    // engine finds no local store and rejoins as a fresh member.
    std::fs::rename(&db.db_file, &backup).map_err(|e| ReconcileError::Backup {
        file: db.db_file.clone(),
        source: e,
    })?;
    info!(
        "backed up {} database file to {}",
        db.name,
        backup.display()
    );

    let args = vec!["exit".to_string()];
    if let Err(e) = db.channel.execute(db.call_timeout, &args).await {
        return Err(ReconcileError::Restart {
            db: db.name.clone(),
            backup,
            source: e,
        });
    }
    info!("requested restart of {} database process", db.name);
    Ok(backup)
}
