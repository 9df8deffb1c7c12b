//! Network-resilient CRUD over the remote backend and the local cache.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::connectivity::ConnectivityHandle;
use super::pending_model::EntityOperation;
use super::remote::RemoteClient;
use super::replay::dispatch_entity;
use super::session::Session;
use crate::errors::{Error, Result};
use crate::models::{EntityKind, SyncedEntity};
use crate::storage::LocalStore;

/// Cache slot key for one user's collection of `kind`.
pub fn cache_key(kind: EntityKind, username: &str) -> String {
    format!("{}_{}", kind.collection(), username)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The backend confirmed the change.
    Synced,
    /// Applied to the cache only and queued for replay.
    Queued,
}

/// Result of a mutation. Never an error for remote failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationStatus {
    pub outcome: MutationOutcome,
    pub message: String,
}

impl MutationStatus {
    fn new(kind: EntityKind, verb: &str, outcome: MutationOutcome) -> Self {
        let message = match outcome {
            MutationOutcome::Synced => format!("{} {} successfully", kind.label(), verb),
            MutationOutcome::Queued => {
                format!("{} {} locally, will sync when online", kind.label(), verb)
            }
        };
        Self { outcome, message }
    }

    pub fn is_synced(&self) -> bool {
        self.outcome == MutationOutcome::Synced
    }
}

enum Attempt {
    Synced(Option<Value>),
    Deferred,
}

impl Attempt {
    fn outcome(&self) -> MutationOutcome {
        match self {
            Self::Synced(_) => MutationOutcome::Synced,
            Self::Deferred => MutationOutcome::Queued,
        }
    }
}

/// Offline-first data access for every entity kind.
///
/// Each mutation writes the cache whatever the remote outcome; a mutation
/// the backend did not confirm is also appended to the user's pending queue.
pub struct SyncOverlay {
    pub(super) remote: Arc<dyn RemoteClient>,
    pub(super) store: LocalStore,
    pub(super) connectivity: ConnectivityHandle,
    pub(super) session: Session,
    pub(super) replay_lock: tokio::sync::Mutex<()>,
}

impl SyncOverlay {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        store: LocalStore,
        connectivity: ConnectivityHandle,
    ) -> Self {
        let session = Session::new(store.clone());
        Self {
            remote,
            store,
            connectivity,
            session,
            replay_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn connectivity(&self) -> &ConnectivityHandle {
        &self.connectivity
    }

    /// Fresh list from the backend when online, the cache otherwise.
    ///
    /// A remote failure falls back to the cache and is only returned when
    /// there is no cache to fall back to.
    pub async fn get_all<E: SyncedEntity>(&self, username: &str) -> Result<Vec<E>> {
        let kind = E::KIND;
        if !self.connectivity.is_online() {
            debug!("[Overlay] Offline, serving cached {}", kind.collection());
            return self.cached(username);
        }

        match self.remote.get_all(kind, username).await {
            Ok(records) => {
                self.write_cache(kind, username, &records)?;
                Ok(decode_records(kind, records))
            }
            Err(err) => {
                warn!(
                    "[Overlay] Fetching {} for {} failed, using cache: {}",
                    kind.collection(),
                    username,
                    err
                );
                match self.read_cache(kind, username)? {
                    Some(records) => Ok(decode_records(kind, records)),
                    None => Err(Error::Remote(err)),
                }
            }
        }
    }

    /// Cached list without touching the backend. Empty when nothing is cached.
    pub fn cached<E: SyncedEntity>(&self, username: &str) -> Result<Vec<E>> {
        Ok(self
            .read_cache(E::KIND, username)?
            .map(|records| decode_records(E::KIND, records))
            .unwrap_or_default())
    }

    pub fn find_cached<E: SyncedEntity>(&self, username: &str, id: &str) -> Result<Option<E>> {
        Ok(self
            .cached::<E>(username)?
            .into_iter()
            .find(|entity| entity.id() == id))
    }

    /// Creates a record under a locally generated id.
    ///
    /// Returns the backend's row when the create was confirmed, otherwise the
    /// locally built candidate, which is cached and queued.
    pub async fn add<E: SyncedEntity>(&self, username: &str, draft: E::Draft) -> Result<E> {
        let candidate = E::from_draft(LocalStore::generate_id(), &draft, LocalStore::now_ms());
        self.insert(username, candidate).await
    }

    /// Re-creates a record under its existing id.
    pub async fn restore<E: SyncedEntity>(&self, username: &str, record: E) -> Result<E> {
        self.insert(username, record).await
    }

    async fn insert<E: SyncedEntity>(&self, username: &str, candidate: E) -> Result<E> {
        let kind = E::KIND;
        let op = EntityOperation::Add(candidate.clone());
        let local = serde_json::to_value(&candidate)?;

        let (entity, record) = match self.try_remote(username, &op).await? {
            Attempt::Synced(Some(created)) => match serde_json::from_value::<E>(created.clone()) {
                Ok(entity) => (entity, created),
                Err(e) => {
                    warn!(
                        "[Overlay] Unreadable {} returned by create, keeping local copy: {}",
                        kind, e
                    );
                    (candidate, local)
                }
            },
            Attempt::Synced(None) => (candidate, local),
            Attempt::Deferred => {
                self.prepend_cached(kind, username, local)?;
                self.enqueue(username, op)?;
                return Ok(candidate);
            }
        };

        self.prepend_cached(kind, username, record)?;
        Ok(entity)
    }

    /// Shallow-merges `updates` into the cached record with `id`.
    pub async fn update<E: SyncedEntity>(
        &self,
        username: &str,
        id: &str,
        updates: E::Patch,
    ) -> Result<MutationStatus> {
        let updates = E::normalize_patch(updates);
        let patch = serde_json::to_value(&updates)?;
        let op = EntityOperation::<E>::Update {
            id: id.to_string(),
            updates,
        };
        let attempt = self.try_remote(username, &op).await?;

        self.rewrite_cache(E::KIND, username, |records| {
            for record in records.iter_mut().filter(|r| record_id(r) == Some(id)) {
                shallow_merge(record, &patch);
            }
        })?;
        self.finish(username, op, attempt, "updated")
    }

    pub async fn delete<E: SyncedEntity>(&self, username: &str, id: &str) -> Result<MutationStatus> {
        let op = EntityOperation::<E>::Delete { id: id.to_string() };
        let attempt = self.try_remote(username, &op).await?;

        self.rewrite_cache(E::KIND, username, |records| {
            records.retain(|r| record_id(r) != Some(id));
        })?;
        self.finish(username, op, attempt, "deleted")
    }

    pub async fn bulk_delete<E: SyncedEntity>(
        &self,
        username: &str,
        ids: &[String],
    ) -> Result<MutationStatus> {
        let op = EntityOperation::<E>::BulkDelete { ids: ids.to_vec() };
        let attempt = self.try_remote(username, &op).await?;

        let targets = ids.iter().map(String::as_str).collect::<HashSet<_>>();
        self.rewrite_cache(E::KIND, username, |records| {
            records.retain(|r| !record_id(r).is_some_and(|id| targets.contains(id)));
        })?;
        self.finish(username, op, attempt, "bulk deleted")
    }

    pub async fn bulk_update<E: SyncedEntity>(
        &self,
        username: &str,
        ids: &[String],
        updates: E::Patch,
    ) -> Result<MutationStatus> {
        let updates = E::normalize_patch(updates);
        let patch = serde_json::to_value(&updates)?;
        let op = EntityOperation::<E>::BulkUpdate {
            ids: ids.to_vec(),
            updates,
        };
        let attempt = self.try_remote(username, &op).await?;

        let targets = ids.iter().map(String::as_str).collect::<HashSet<_>>();
        self.rewrite_cache(E::KIND, username, |records| {
            for record in records
                .iter_mut()
                .filter(|r| record_id(r).is_some_and(|id| targets.contains(id)))
            {
                shallow_merge(record, &patch);
            }
        })?;
        self.finish(username, op, attempt, "bulk updated")
    }

    pub fn pending_count(&self, username: &str) -> Result<usize> {
        Ok(self.store.get_pending_operations(username)?.len())
    }

    /// When the cache slot for `kind` was last written.
    pub fn last_synced_at(&self, username: &str, kind: EntityKind) -> Result<Option<DateTime<Utc>>> {
        let envelope = self
            .store
            .retrieve_envelope::<Vec<Value>>(&cache_key(kind, username))?;
        Ok(envelope.and_then(|envelope| DateTime::<Utc>::from_timestamp_millis(envelope.timestamp)))
    }

    async fn try_remote<E: SyncedEntity>(
        &self,
        username: &str,
        op: &EntityOperation<E>,
    ) -> Result<Attempt> {
        if !self.connectivity.is_online() {
            debug!(
                "[Overlay] Offline, deferring {}_{}",
                op.action(),
                E::KIND
            );
            return Ok(Attempt::Deferred);
        }
        match dispatch_entity(self.remote.as_ref(), username, op).await {
            Ok(created) => Ok(Attempt::Synced(created)),
            Err(Error::Remote(err)) => {
                warn!(
                    "[Overlay] {}_{} failed [{:?}], applying locally: {}",
                    op.action(),
                    E::KIND,
                    err.retry_class,
                    err
                );
                Ok(Attempt::Deferred)
            }
            Err(err) => Err(err),
        }
    }

    fn finish<E: SyncedEntity>(
        &self,
        username: &str,
        op: EntityOperation<E>,
        attempt: Attempt,
        verb: &str,
    ) -> Result<MutationStatus> {
        if let Attempt::Deferred = attempt {
            self.enqueue(username, op)?;
        }
        Ok(MutationStatus::new(E::KIND, verb, attempt.outcome()))
    }

    fn enqueue<E: SyncedEntity>(&self, username: &str, op: EntityOperation<E>) -> Result<()> {
        self.store
            .store_pending_operation(username, E::into_pending(op))
            .map(|_| ())
    }

    fn read_cache(&self, kind: EntityKind, username: &str) -> Result<Option<Vec<Value>>> {
        self.store.retrieve(&cache_key(kind, username))
    }

    fn write_cache(&self, kind: EntityKind, username: &str, records: &[Value]) -> Result<()> {
        self.store.store(&cache_key(kind, username), &records)
    }

    fn prepend_cached(&self, kind: EntityKind, username: &str, record: Value) -> Result<()> {
        self.rewrite_cache(kind, username, |records| records.insert(0, record))
    }

    /// Reads the whole slot, transforms it in memory and writes it back.
    fn rewrite_cache<F>(&self, kind: EntityKind, username: &str, transform: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Value>),
    {
        let mut records = self.read_cache(kind, username)?.unwrap_or_default();
        transform(&mut records);
        self.write_cache(kind, username, &records)
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn shallow_merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (field, value) in patch {
            target.insert(field.clone(), value.clone());
        }
    }
}

fn decode_records<E: SyncedEntity>(kind: EntityKind, records: Vec<Value>) -> Vec<E> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<E>(record) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!("[Overlay] Skipping unreadable {} record: {}", kind, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn shallow_merge_replaces_only_patched_fields() {
        let mut record = json!({ "id": "t-1", "text": "a", "completed": false });
        shallow_merge(&mut record, &json!({ "completed": true }));
        assert_eq!(record, json!({ "id": "t-1", "text": "a", "completed": true }));
    }

    #[test]
    fn status_messages_differ_by_outcome() {
        let synced = MutationStatus::new(EntityKind::Todo, "updated", MutationOutcome::Synced);
        let queued = MutationStatus::new(EntityKind::Budget, "deleted", MutationOutcome::Queued);
        assert_eq!(synced.message, "Todo updated successfully");
        assert_eq!(queued.message, "Budget deleted locally, will sync when online");
        assert!(synced.is_synced());
        assert!(!queued.is_synced());
    }

    #[test]
    fn cache_keys_follow_collection_and_user() {
        assert_eq!(cache_key(EntityKind::Wallet, "ana"), "wallets_ana");
    }
}
