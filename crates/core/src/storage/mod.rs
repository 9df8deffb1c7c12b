//! Local persistence: a namespaced, timestamped JSON store over a pluggable
//! key-value medium, plus the per-user pending operation log.

mod local_store;
mod pending;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::{Error, Result};

pub use local_store::{LocalStore, StoredEnvelope, ENVELOPE_VERSION, STORAGE_KEY_PREFIX};
pub use pending::pending_key;

/// Synchronous key-value medium the local store is built on.
///
/// Values are serialized JSON text. Reading an absent key is `Ok(None)`;
/// errors are reserved for the medium itself failing.
pub trait KeyValueMedium: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;
    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()>;
    fn delete(&self, namespace: &str, key: &str) -> Result<()>;
}

/// Process-local medium. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::storage("In-memory key-value store is poisoned"))
    }
}

impl KeyValueMedium for MemoryKeyValueStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .lock()?
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        self.lock()?
            .insert((namespace.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        self.lock()?
            .remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }
}
