use std::path::PathBuf;
use thiserror::Error;

/// Failures turning a raw cluster-status report into a [`ClusterStatus`].
///
/// [`ClusterStatus`]: crate::types::ClusterStatus
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing required field `{0}` in cluster status")]
    MissingField(&'static str),

    #[error("unable to parse address `{0}`")]
    Address(String),

    #[error("failed to get current election timer from `{0}`")]
    ElectionTimer(String),

    #[error("unable to parse term `{0}`")]
    Term(String),

    #[error("unknown raft role `{0}`")]
    Role(String),

    #[error("expected exactly one self entry in the server table")]
    NoSelfEntry,
}

/// Transport-level failures on the admin channel to the database engine.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("control command {args:?} timed out after {timeout_ms} ms")]
    Timeout { args: Vec<String>, timeout_ms: u64 },

    #[error("control command {args:?} failed: {stderr}")]
    Failed { args: Vec<String>, stderr: String },

    #[error("failed to run control utility: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of one reconciliation operation against one managed database.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("unable to obtain local server identity for {db}: {source}")]
    ServerIdQuery {
        db: String,
        #[source]
        source: AdminError,
    },

    #[error("invalid server identity `{sid}` found for {db}")]
    InvalidServerId { db: String, sid: String },

    #[error("unable to obtain cluster status for {db}: {source}")]
    StatusQuery {
        db: String,
        #[source]
        source: AdminError,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid database name `{0}`")]
    InvalidDbName(String),

    #[error("unable to determine known members for {0}")]
    Membership(String),

    #[error("error while kicking raft member {sid} from {db}: {source}")]
    Kick {
        db: String,
        sid: String,
        #[source]
        source: AdminError,
    },

    #[error("failed to kick raft members: {}", .0.join("; "))]
    KickMany(Vec<String>),

    #[error("failed to change election timer for {db} to {value}: {source}")]
    ChangeTimer {
        db: String,
        value: i64,
        #[source]
        source: AdminError,
    },

    #[error("failed to back up the database file {}: {source}", .file.display())]
    Backup {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to restart the database {db}, backup retained at {}: {source}", .backup.display())]
    Restart {
        db: String,
        backup: PathBuf,
        #[source]
        source: AdminError,
    },
}

impl ReconcileError {
    /// True for the failure kinds that mean the local replica could not even
    /// report its cluster status. Consecutive occurrences of these feed the
    /// disaster-recovery counter.
    pub fn is_status_failure(&self) -> bool {
        matches!(
            self,
            ReconcileError::StatusQuery { .. } | ReconcileError::Parse(_)
        )
    }
}
