use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{DB_NORTH, DB_SOUTH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Seconds between reconcile cycles for each database.
    pub tick_interval_secs: u64,
    /// Per-call timeout for admin channel commands, in seconds.
    pub call_timeout_secs: u64,
    /// Consecutive status-query failures tolerated before the local replica
    /// is backed up and restarted.
    pub max_status_retries: u32,

    pub northbound: DbSettings,
    pub southbound: DbSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbSettings {
    /// Logical database name, as used in admin verbs.
    pub name: String,
    /// Short alias used for on-disk file naming.
    pub alias: String,
    /// The local on-disk database file.
    pub db_file: PathBuf,
    /// Control utility invoked to reach the engine.
    pub ctl_program: String,
    /// Control socket of the local engine process.
    pub ctl_target: String,
    /// Target election timer in milliseconds.
    pub election_timer_ms: i64,
    /// Comma-separated known-good member addresses.
    pub members: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            call_timeout_secs: 5,
            max_status_retries: 10,
            northbound: DbSettings::default_north(),
            southbound: DbSettings::default_south(),
        }
    }
}

impl DbSettings {
    pub fn default_north() -> Self {
        Self {
            name: DB_NORTH.to_string(),
            alias: "nbdb".to_string(),
            db_file: PathBuf::from("/var/lib/raftwarden/nbdb.db"),
            ctl_program: "db-ctl".to_string(),
            ctl_target: "/var/run/raftwarden/nbdb.ctl".to_string(),
            election_timer_ms: 10_000,
            members: String::new(),
        }
    }

    pub fn default_south() -> Self {
        Self {
            name: DB_SOUTH.to_string(),
            alias: "sbdb".to_string(),
            db_file: PathBuf::from("/var/lib/raftwarden/sbdb.db"),
            ctl_program: "db-ctl".to_string(),
            ctl_target: "/var/run/raftwarden/sbdb.ctl".to_string(),
            election_timer_ms: 16_000,
            members: String::new(),
        }
    }
}

impl AgentConfig {
    pub fn load(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &PathBuf) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}
