//! Pending queue replay and the remote dispatcher shared with the overlay.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;

use super::overlay::SyncOverlay;
use super::pending_model::{EntityOperation, OperationKind};
use super::remote::RemoteClient;
use crate::errors::{Error, Result};
use crate::models::SyncedEntity;

/// Issues the single remote call an operation stands for.
///
/// Returns the created row for adds.
pub(crate) async fn dispatch_entity<E: SyncedEntity>(
    remote: &dyn RemoteClient,
    username: &str,
    op: &EntityOperation<E>,
) -> Result<Option<Value>> {
    let kind = E::KIND;
    match op {
        EntityOperation::Add(record) => {
            let created = remote
                .create(kind, username, serde_json::to_value(record)?)
                .await?;
            return Ok(Some(created));
        }
        EntityOperation::Update { id, updates } => {
            remote.update(kind, id, serde_json::to_value(updates)?).await?
        }
        EntityOperation::Delete { id } => remote.delete(kind, id).await?,
        EntityOperation::BulkDelete { ids } => remote.bulk_delete(kind, ids).await?,
        EntityOperation::BulkUpdate { ids, updates } => {
            remote
                .bulk_update(kind, ids, serde_json::to_value(updates)?)
                .await?
        }
    }
    Ok(None)
}

pub async fn dispatch_operation(
    remote: &dyn RemoteClient,
    username: &str,
    operation: &OperationKind,
) -> Result<()> {
    match operation {
        OperationKind::Todo(op) => dispatch_entity(remote, username, op).await?,
        OperationKind::Budget(op) => dispatch_entity(remote, username, op).await?,
        OperationKind::Transaction(op) => dispatch_entity(remote, username, op).await?,
        OperationKind::Wallet(op) => dispatch_entity(remote, username, op).await?,
        OperationKind::Goal(op) => dispatch_entity(remote, username, op).await?,
    };
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStatus {
    /// Nothing was queued.
    Idle,
    /// Every queued operation was accepted.
    Completed,
    /// At least one operation failed and is still queued.
    Partial,
    /// Nobody is signed in.
    NoSession,
}

/// Summary of one replay pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub status: ReplayStatus,
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    pub duration_ms: i64,
}

impl ReplayReport {
    fn empty(status: ReplayStatus) -> Self {
        Self {
            status,
            attempted: 0,
            synced: 0,
            failed: 0,
            duration_ms: 0,
        }
    }
}

impl SyncOverlay {
    /// Replays the signed-in user's queue.
    pub async fn sync_pending_operations(&self) -> Result<ReplayReport> {
        match self.session.current_user()? {
            Some(username) => self.sync_pending_operations_for(&username).await,
            None => {
                debug!("[Replay] No signed-in user, nothing to replay");
                Ok(ReplayReport::empty(ReplayStatus::NoSession))
            }
        }
    }

    /// Replays `username`'s queue in enqueue order, one call at a time.
    ///
    /// Accepted operations are removed one by one; failed ones stay queued
    /// and do not stop the pass. Overlapping calls run one after another.
    pub async fn sync_pending_operations_for(&self, username: &str) -> Result<ReplayReport> {
        let _guard = self.replay_lock.lock().await;
        let started = Instant::now();

        let pending = self.store.get_pending_operations(username)?;
        if pending.is_empty() {
            return Ok(ReplayReport::empty(ReplayStatus::Idle));
        }
        info!(
            "[Replay] Replaying {} pending operation(s) for {}",
            pending.len(),
            username
        );

        let mut report = ReplayReport::empty(ReplayStatus::Completed);
        for entry in pending {
            report.attempted += 1;
            match dispatch_operation(self.remote.as_ref(), username, &entry.operation).await {
                Ok(()) => {
                    self.store.remove_pending_operation(username, &entry.id)?;
                    report.synced += 1;
                    debug!("[Replay] Synced {} ({})", entry.label(), entry.id);
                }
                Err(Error::Remote(err)) => {
                    report.failed += 1;
                    error!(
                        "[Replay] {} ({}) failed [{:?}]: {}",
                        entry.label(),
                        entry.id,
                        err.retry_class,
                        err
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    error!("[Replay] {} ({}) failed: {}", entry.label(), entry.id, err);
                }
            }
        }

        if report.failed > 0 {
            report.status = ReplayStatus::Partial;
        }
        report.duration_ms = started.elapsed().as_millis() as i64;
        info!(
            "[Replay] Finished for {}: {} synced, {} failed in {}ms",
            username, report.synced, report.failed, report.duration_ms
        );
        Ok(report)
    }

    /// Replays the signed-in user's queue after every offline-to-online edge.
    ///
    /// The task ends when the connectivity tracker is dropped.
    pub fn spawn_replay_on_reconnect(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.connectivity.subscribe();
        let mut seen = rx.borrow_and_update().reconnects;
        let overlay = Arc::clone(self);

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = *rx.borrow_and_update();
                if !snapshot.online || snapshot.reconnects == seen {
                    continue;
                }
                seen = snapshot.reconnects;
                match overlay.sync_pending_operations().await {
                    Ok(report) => debug!("[Replay] Reconnect pass: {:?}", report.status),
                    Err(e) => warn!("[Replay] Reconnect pass aborted: {}", e),
                }
            }
            debug!("[Replay] Connectivity tracker gone, stopping reconnect listener");
        })
    }
}
