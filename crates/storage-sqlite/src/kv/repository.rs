use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use log::debug;

use leirad_core::storage::KeyValueMedium;
use leirad_core::Result;

use super::model::KvEntryDB;
use crate::db::{self, get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::kv_entries::dsl::*;

/// Durable key-value medium backed by a single SQLite table.
pub struct SqliteKeyValueStore {
    pool: Arc<DbPool>,
}

impl SqliteKeyValueStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Prepares `leirad.db` inside `app_data_dir`, migrates it and opens a pool.
    pub fn open(app_data_dir: &str) -> std::result::Result<Self, StorageError> {
        let db_path = db::init(app_data_dir)?;
        db::run_migrations(&db_path)?;
        let pool = db::create_pool(&db_path)?;
        Ok(Self::new(pool))
    }

    /// All entries of one namespace, ordered by key.
    pub fn entries(&self, ns: &str) -> Result<Vec<KvEntryDB>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = kv_entries
            .filter(namespace.eq(ns))
            .order(entry_key.asc())
            .select(KvEntryDB::as_select())
            .load::<KvEntryDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows)
    }
}

impl KeyValueMedium for SqliteKeyValueStore {
    fn get(&self, ns: &str, key: &str) -> Result<Option<String>> {
        let mut conn = get_connection(&self.pool)?;
        let value = kv_entries
            .find((ns, key))
            .select(entry_value)
            .first::<String>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(value)
    }

    fn set(&self, ns: &str, key: &str, value: &str) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        let now = Utc::now().to_rfc3339();
        let row = KvEntryDB {
            namespace: ns.to_string(),
            entry_key: key.to_string(),
            entry_value: value.to_string(),
            updated_at: now.clone(),
        };

        diesel::insert_into(kv_entries)
            .values(&row)
            .on_conflict((namespace, entry_key))
            .do_update()
            .set((entry_value.eq(value), updated_at.eq(now)))
            .execute(&mut conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn delete(&self, ns: &str, key: &str) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        let removed = diesel::delete(kv_entries.find((ns, key)))
            .execute(&mut conn)
            .map_err(StorageError::from)?;
        if removed == 0 {
            debug!("[Storage] Delete of missing key {}/{}", ns, key);
        }
        Ok(())
    }
}
