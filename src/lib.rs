pub mod admin;
pub mod config;
pub mod error;
pub mod membership;
pub mod monitor;
pub mod reconciler;
pub mod status;
pub mod types;

pub use admin::{AdminChannel, CmdOutput, CtlChannel};
pub use config::{AgentConfig, DbSettings};
pub use error::{AdminError, ParseError, ReconcileError};
pub use membership::{MembershipSource, StaticMembership};
pub use monitor::ClusterWarden;
pub use reconciler::{
    ensure_cluster_membership, ensure_election_timeout, ensure_local_server_id,
    next_election_step, reset_database, ManagedDatabase,
};
pub use status::parse_cluster_status;
pub use types::*;
