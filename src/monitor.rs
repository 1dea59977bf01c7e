//! Periodic driver. Runs one reconcile loop per managed database; the two
//! loops run concurrently, but a single database's cycles never overlap.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::admin::CtlChannel;
use crate::config::AgentConfig;
use crate::membership::{MembershipSource, StaticMembership};
use crate::reconciler::{
    ensure_cluster_membership, ensure_election_timeout, ensure_local_server_id, reset_database,
    ManagedDatabase,
};

pub struct ClusterWarden {
    north: ManagedDatabase,
    south: ManagedDatabase,
    membership: Arc<dyn MembershipSource>,
    tick_interval: std::time::Duration,
    max_status_retries: u32,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ClusterWarden {
    pub fn new(config: &AgentConfig) -> Self {
        let timeout = config.call_timeout();
        let north_channel = Arc::new(CtlChannel::new(
            config.northbound.ctl_program.clone(),
            config.northbound.ctl_target.clone(),
        ));
        let south_channel = Arc::new(CtlChannel::new(
            config.southbound.ctl_program.clone(),
            config.southbound.ctl_target.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            north: ManagedDatabase::new(&config.northbound, north_channel, timeout),
            south: ManagedDatabase::new(&config.southbound, south_channel, timeout),
            membership: Arc::new(StaticMembership::from_config(config)),
            tick_interval: config.tick_interval(),
            max_status_retries: config.max_status_retries,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            "starting reconcile loops for {} and {}",
            self.north.name, self.south.name
        );

        let north_handle = self.spawn_reconcile_loop(self.north.clone());
        let south_handle = self.spawn_reconcile_loop(self.south.clone());

        tokio::select! {
            _ = north_handle => {
                error!("northbound reconcile loop exited unexpectedly");
            }
            _ = south_handle => {
                error!("southbound reconcile loop exited unexpectedly");
            }
            _ = self.wait_for_shutdown() => {
                info!("shutdown signal received");
            }
        }

        Ok(())
    }

    fn spawn_reconcile_loop(&self, mut db: ManagedDatabase) -> tokio::task::JoinHandle<()> {
        let membership = self.membership.clone();
        let tick_interval = self.tick_interval;
        let max_status_retries = self.max_status_retries;
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        reconcile_cycle(&mut db, membership.as_ref(), max_status_retries).await;
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }
        })
    }

    async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_rx.clone();
        while !*rx.borrow() {
            let _ = rx.changed().await;
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// One reconcile cycle for one database. Failures are logged, never fatal;
/// retry is deferred to the next tick. Repeated status-query failures feed
/// the disaster-recovery counter and eventually trigger a reset.
pub async fn reconcile_cycle(
    db: &mut ManagedDatabase,
    membership: &dyn MembershipSource,
    max_status_retries: u32,
) {
    let mut status_ok = true;

    if let Err(e) = ensure_local_server_id(db).await {
        status_ok &= !e.is_status_failure();
        warn!("local server id reconciliation failed for {}: {}", db.name, e);
    }
    if let Err(e) = ensure_cluster_membership(db, membership).await {
        status_ok &= !e.is_status_failure();
        warn!("membership reconciliation failed for {}: {}", db.name, e);
    }
    if let Err(e) = ensure_election_timeout(db).await {
        status_ok &= !e.is_status_failure();
        warn!("election timer reconciliation failed for {}: {}", db.name, e);
    }

    if status_ok {
        db.status_failures = 0;
        return;
    }

    db.status_failures += 1;
    if db.status_failures <= max_status_retries {
        warn!(
            "{} cluster status unavailable ({} consecutive failures)",
            db.name, db.status_failures
        );
        return;
    }

    error!(
        "{} cluster status unavailable after {} attempts, resetting local replica",
        db.name, db.status_failures
    );
    match reset_database(db).await {
        Ok(backup) => {
            info!(
                "reset {} database, backup retained at {}",
                db.name,
                backup.display()
            );
        }
        Err(e) => {
            error!("failed to reset {} database: {}", db.name, e);
        }
    }
    db.status_failures = 0;
}
