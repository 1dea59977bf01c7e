use std::collections::HashMap;
use tracing::warn;

use crate::config::AgentConfig;
use crate::error::ReconcileError;
use crate::status::is_valid_address;
use crate::types::{DB_NORTH, DB_SOUTH};

/// Supplies the authoritative set of addresses that are allowed to be raft
/// members of a given database. Backed by cluster configuration here; a
/// deployment with a node inventory service would implement this against it.
pub trait MembershipSource: Send + Sync {
    fn known_members(&self, db_name: &str) -> Result<Vec<String>, ReconcileError>;
}

/// [`MembershipSource`] over the comma-separated member lists from the agent
/// configuration.
pub struct StaticMembership {
    members: HashMap<String, String>,
}

impl StaticMembership {
    pub fn new(north_members: impl Into<String>, south_members: impl Into<String>) -> Self {
        let mut members = HashMap::new();
        members.insert(DB_NORTH.to_string(), north_members.into());
        members.insert(DB_SOUTH.to_string(), south_members.into());
        Self { members }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.northbound.members.clone(),
            config.southbound.members.clone(),
        )
    }
}

impl MembershipSource for StaticMembership {
    fn known_members(&self, db_name: &str) -> Result<Vec<String>, ReconcileError> {
        let raw = self
            .members
            .get(db_name)
            .ok_or_else(|| ReconcileError::Membership(db_name.to_string()))?;

        let mut members = Vec::new();
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if !is_valid_address(entry) {
                warn!("ignoring malformed known member for {}: {}", db_name, entry);
                continue;
            }
            members.push(entry.to_string());
        }
        Ok(members)
    }
}
