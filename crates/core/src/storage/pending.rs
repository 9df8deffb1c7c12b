//! Per-user pending operation log, persisted through the local store.
//!
//! All three mutating helpers are read-modify-write over the whole list and
//! hold the store's queue lock for the duration, so appends and removals
//! from different tasks never drop each other's entries.

use std::sync::MutexGuard;

use log::debug;

use super::LocalStore;
use crate::errors::{Error, Result};
use crate::sync::{OperationKind, PendingOperation};

/// Local store key holding `username`'s pending operations.
pub fn pending_key(username: &str) -> String {
    format!("pending_ops_{}", username)
}

impl LocalStore {
    fn lock_queue(&self) -> Result<MutexGuard<'_, ()>> {
        self.queue_lock
            .lock()
            .map_err(|_| Error::storage("Pending operation lock is poisoned"))
    }

    /// Appends an operation to the end of `username`'s queue.
    pub fn store_pending_operation(
        &self,
        username: &str,
        operation: OperationKind,
    ) -> Result<PendingOperation> {
        let _guard = self.lock_queue()?;
        let key = pending_key(username);
        let mut pending: Vec<PendingOperation> = self.retrieve(&key)?.unwrap_or_default();
        let entry = PendingOperation {
            id: Self::generate_id(),
            operation,
            timestamp: Self::now_ms(),
        };
        pending.push(entry.clone());
        self.store(&key, &pending)?;
        debug!(
            "[LocalStore] queued {} for {} ({} pending)",
            entry.label(),
            username,
            pending.len()
        );
        Ok(entry)
    }

    /// `username`'s queue in enqueue order.
    pub fn get_pending_operations(&self, username: &str) -> Result<Vec<PendingOperation>> {
        Ok(self.retrieve(&pending_key(username))?.unwrap_or_default())
    }

    /// Drops the entry with `operation_id`; returns whether it was present.
    pub fn remove_pending_operation(&self, username: &str, operation_id: &str) -> Result<bool> {
        let _guard = self.lock_queue()?;
        let key = pending_key(username);
        let mut pending: Vec<PendingOperation> = self.retrieve(&key)?.unwrap_or_default();
        let before = pending.len();
        pending.retain(|op| op.id != operation_id);
        if pending.len() == before {
            return Ok(false);
        }
        self.store(&key, &pending)?;
        Ok(true)
    }

    pub fn clear_pending_operations(&self, username: &str) -> Result<()> {
        let _guard = self.lock_queue()?;
        self.remove(&pending_key(username))
    }
}
