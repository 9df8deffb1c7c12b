//! Typed pending operation log entries.

use serde::{Deserialize, Serialize};

use crate::models::{Budget, EntityKind, Goal, SyncedEntity, Todo, Transaction, Wallet};

/// One deferred mutation against a single entity kind.
///
/// The payload is fixed when the operation is queued; replay sends it as is,
/// whatever the cache looks like by then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "payload", rename_all = "snake_case", bound = "")]
pub enum EntityOperation<E: SyncedEntity> {
    /// Full optimistic record, including its locally generated id.
    Add(E),
    Update {
        id: String,
        updates: E::Patch,
    },
    Delete {
        id: String,
    },
    BulkDelete {
        ids: Vec<String>,
    },
    BulkUpdate {
        ids: Vec<String>,
        updates: E::Patch,
    },
}

impl<E: SyncedEntity> EntityOperation<E> {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::BulkDelete { .. } => "bulk_delete",
            Self::BulkUpdate { .. } => "bulk_update",
        }
    }

    /// Ids the operation touches.
    pub fn target_ids(&self) -> Vec<&str> {
        match self {
            Self::Add(record) => vec![record.id()],
            Self::Update { id, .. } | Self::Delete { id } => vec![id.as_str()],
            Self::BulkDelete { ids } | Self::BulkUpdate { ids, .. } => {
                ids.iter().map(String::as_str).collect()
            }
        }
    }
}

/// Tagged union over entity kind and operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "action", rename_all = "snake_case")]
pub enum OperationKind {
    Todo(EntityOperation<Todo>),
    Budget(EntityOperation<Budget>),
    Transaction(EntityOperation<Transaction>),
    Wallet(EntityOperation<Wallet>),
    Goal(EntityOperation<Goal>),
}

impl OperationKind {
    pub fn entity(&self) -> EntityKind {
        match self {
            Self::Todo(_) => EntityKind::Todo,
            Self::Budget(_) => EntityKind::Budget,
            Self::Transaction(_) => EntityKind::Transaction,
            Self::Wallet(_) => EntityKind::Wallet,
            Self::Goal(_) => EntityKind::Goal,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Todo(op) => op.action(),
            Self::Budget(op) => op.action(),
            Self::Transaction(op) => op.action(),
            Self::Wallet(op) => op.action(),
            Self::Goal(op) => op.action(),
        }
    }

    /// Short name for logs, e.g. `update_wallet`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.action(), self.entity())
    }
}

/// A queued mutation awaiting replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub id: String,
    pub operation: OperationKind,
    /// Enqueue time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl PendingOperation {
    pub fn label(&self) -> String {
        self.operation.label()
    }

    pub fn entity(&self) -> EntityKind {
        self.operation.entity()
    }
}
