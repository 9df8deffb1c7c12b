//! Contract for the hosted backend the overlay writes through to.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::RemoteError;
use crate::models::EntityKind;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// One call per capability; every failure is an `Err`.
///
/// Records travel as JSON objects shaped like the entity's serde form.
/// `create` receives the full record including its client-chosen `id` and
/// returns the stored row.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn get_all(&self, kind: EntityKind, username: &str) -> RemoteResult<Vec<Value>>;

    async fn create(&self, kind: EntityKind, username: &str, record: Value) -> RemoteResult<Value>;

    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> RemoteResult<()>;

    async fn delete(&self, kind: EntityKind, id: &str) -> RemoteResult<()>;

    async fn bulk_delete(&self, kind: EntityKind, ids: &[String]) -> RemoteResult<()>;

    async fn bulk_update(&self, kind: EntityKind, ids: &[String], patch: Value)
        -> RemoteResult<()>;
}
