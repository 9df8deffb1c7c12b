//! SQLite-backed key-value medium for the leirad local store.
//!
//! Each entry is one row keyed by `(namespace, entry_key)`; the value column
//! holds the JSON envelope text written by [`leirad_core::storage::LocalStore`].

pub mod db;
pub mod errors;
pub mod kv;
pub mod schema;

pub use db::{create_pool, get_connection, init, run_migrations, DbPool};
pub use errors::StorageError;
pub use kv::SqliteKeyValueStore;
