use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::KeyValueMedium;
use crate::errors::Result;

/// Namespace every local entry is written under.
pub const STORAGE_KEY_PREFIX: &str = "leirad_offline_";

/// Envelope format version written with every entry.
pub const ENVELOPE_VERSION: u32 = 1;

/// On-medium wrapper around a stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEnvelope<T> {
    pub data: T,
    /// Milliseconds since the Unix epoch at write time.
    pub timestamp: i64,
    pub version: u32,
}

/// Namespaced, timestamped JSON persistence over a [`KeyValueMedium`].
///
/// Cheap to clone; clones share the medium and the pending-queue lock.
#[derive(Clone)]
pub struct LocalStore {
    medium: Arc<dyn KeyValueMedium>,
    namespace: String,
    pub(super) queue_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    pub fn new(medium: Arc<dyn KeyValueMedium>) -> Self {
        Self::with_namespace(medium, STORAGE_KEY_PREFIX)
    }

    pub fn with_namespace(medium: Arc<dyn KeyValueMedium>, namespace: impl Into<String>) -> Self {
        Self {
            medium,
            namespace: namespace.into(),
            queue_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Milliseconds since the Unix epoch.
    pub fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Writes `data` wrapped in a fresh envelope, replacing whatever was there.
    pub fn store<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let envelope = StoredEnvelope {
            data,
            timestamp: Self::now_ms(),
            version: ENVELOPE_VERSION,
        };
        let serialized = serde_json::to_string(&envelope)?;
        debug!(
            "[LocalStore] store {}{} ({} bytes)",
            self.namespace,
            key,
            serialized.len()
        );
        self.medium.set(&self.namespace, key, &serialized)
    }

    /// Reads the value under `key`.
    ///
    /// A malformed entry is logged and reported as absent.
    pub fn retrieve<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        Ok(self.retrieve_envelope(key)?.map(|envelope| envelope.data))
    }

    /// Like [`retrieve`](Self::retrieve), keeping the write timestamp.
    pub fn retrieve_envelope<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<StoredEnvelope<T>>> {
        let Some(raw) = self.medium.get(&self.namespace, key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<StoredEnvelope<T>>(&raw) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                warn!(
                    "[LocalStore] Discarding unreadable entry {}{}: {}",
                    self.namespace, key, e
                );
                Ok(None)
            }
        }
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.medium.delete(&self.namespace, key)
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.medium.get(&self.namespace, key)?.is_some())
    }

    /// Locally unique identifier: UUIDv7, millisecond time plus random bits.
    ///
    /// Used for offline-created records and for queued operations.
    pub fn generate_id() -> String {
        Uuid::now_v7().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::storage::MemoryKeyValueStore;

    fn store() -> (Arc<MemoryKeyValueStore>, LocalStore) {
        let medium = Arc::new(MemoryKeyValueStore::new());
        let local = LocalStore::new(medium.clone());
        (medium, local)
    }

    #[test]
    fn stores_envelope_under_prefix() {
        let (medium, local) = store();
        local.store("todos_ana", &vec!["a", "b"]).unwrap();

        let raw = medium
            .get(STORAGE_KEY_PREFIX, "todos_ana")
            .unwrap()
            .expect("raw entry");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["data"], serde_json::json!(["a", "b"]));
        assert_eq!(value["version"], 1);
        assert!(value["timestamp"].as_i64().unwrap() > 0);

        let back: Vec<String> = local.retrieve("todos_ana").unwrap().unwrap();
        assert_eq!(back, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn malformed_entry_reads_as_absent() {
        let (medium, local) = store();
        medium
            .set(STORAGE_KEY_PREFIX, "todos_ana", "{not json")
            .unwrap();
        let value: Option<Vec<String>> = local.retrieve("todos_ana").unwrap();
        assert!(value.is_none());
        assert!(local.exists("todos_ana").unwrap());
    }

    #[test]
    fn remove_clears_entry() {
        let (_medium, local) = store();
        local.store("k", &1).unwrap();
        assert!(local.exists("k").unwrap());
        local.remove("k").unwrap();
        assert!(!local.exists("k").unwrap());
        assert_eq!(local.retrieve::<i32>("k").unwrap(), None);
    }

    #[test]
    fn generated_ids_are_unique_v7_uuids() {
        let ids = (0..500).map(|_| LocalStore::generate_id()).collect::<Vec<_>>();
        let unique = ids.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), ids.len());
        let parsed = Uuid::parse_str(&ids[0]).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }
}
