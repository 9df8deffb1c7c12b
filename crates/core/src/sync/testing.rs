//! Scripted in-process backend for overlay tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ConnectivityTracker, RemoteClient, RemoteResult, SyncOverlay};
use crate::errors::RemoteError;
use crate::models::EntityKind;
use crate::storage::{LocalStore, MemoryKeyValueStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub kind: EntityKind,
    pub ids: Vec<String>,
}

#[derive(Default)]
struct FakeState {
    tables: HashMap<EntityKind, Vec<Value>>,
    calls: Vec<RecordedCall>,
    offline: bool,
    failing_ids: HashSet<String>,
}

/// Records every call; fails everything while `set_failing(true)`, and any
/// call touching an id registered with `fail_id`.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().offline = failing;
    }

    pub fn fail_id(&self, id: &str) {
        self.state.lock().unwrap().failing_ids.insert(id.to_string());
    }

    pub fn heal_id(&self, id: &str) {
        self.state.lock().unwrap().failing_ids.remove(id);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn rows(&self, kind: EntityKind) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed(&self, kind: EntityKind, rows: Vec<Value>) {
        self.state.lock().unwrap().tables.insert(kind, rows);
    }

    fn record(
        &self,
        method: &'static str,
        kind: EntityKind,
        ids: Vec<String>,
    ) -> RemoteResult<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method,
            kind,
            ids: ids.clone(),
        });
        if state.offline {
            return Err(RemoteError::transport("connection refused"));
        }
        if ids.iter().any(|id| state.failing_ids.contains(id)) {
            return Err(RemoteError::api(500, "internal error"));
        }
        Ok(state)
    }
}

fn merge(row: &mut Value, patch: &Value) {
    if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
        for (k, v) in patch {
            row.insert(k.clone(), v.clone());
        }
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn get_all(&self, kind: EntityKind, username: &str) -> RemoteResult<Vec<Value>> {
        let state = self.record("get_all", kind, Vec::new())?;
        Ok(state
            .tables
            .get(&kind)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get("username").and_then(Value::as_str) == Some(username))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, kind: EntityKind, username: &str, record: Value) -> RemoteResult<Value> {
        let id = row_id(&record).unwrap_or_default().to_string();
        let mut state = self.record("create", kind, vec![id])?;
        let mut row = record;
        merge(&mut row, &json!({ "username": username }));
        state.tables.entry(kind).or_default().insert(0, row.clone());
        Ok(row)
    }

    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> RemoteResult<()> {
        let mut state = self.record("update", kind, vec![id.to_string()])?;
        for row in state.tables.entry(kind).or_default().iter_mut() {
            if row_id(row) == Some(id) {
                merge(row, &patch);
            }
        }
        Ok(())
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> RemoteResult<()> {
        let mut state = self.record("delete", kind, vec![id.to_string()])?;
        state
            .tables
            .entry(kind)
            .or_default()
            .retain(|row| row_id(row) != Some(id));
        Ok(())
    }

    async fn bulk_delete(&self, kind: EntityKind, ids: &[String]) -> RemoteResult<()> {
        let mut state = self.record("bulk_delete", kind, ids.to_vec())?;
        state
            .tables
            .entry(kind)
            .or_default()
            .retain(|row| !row_id(row).is_some_and(|id| ids.iter().any(|t| t == id)));
        Ok(())
    }

    async fn bulk_update(
        &self,
        kind: EntityKind,
        ids: &[String],
        patch: Value,
    ) -> RemoteResult<()> {
        let mut state = self.record("bulk_update", kind, ids.to_vec())?;
        for row in state.tables.entry(kind).or_default().iter_mut() {
            if row_id(row).is_some_and(|id| ids.iter().any(|t| t == id)) {
                merge(row, &patch);
            }
        }
        Ok(())
    }
}

pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub medium: Arc<MemoryKeyValueStore>,
    pub tracker: ConnectivityTracker,
    pub overlay: Arc<SyncOverlay>,
}

pub fn harness(online: bool) -> Harness {
    let remote = FakeRemote::shared();
    let medium = Arc::new(MemoryKeyValueStore::new());
    let tracker = ConnectivityTracker::new(online);
    let overlay = Arc::new(SyncOverlay::new(
        remote.clone(),
        LocalStore::new(medium.clone()),
        tracker.handle(),
    ));
    Harness {
        remote,
        medium,
        tracker,
        overlay,
    }
}
