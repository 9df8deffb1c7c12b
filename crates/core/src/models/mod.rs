//! Domain records managed by the sync overlay.

mod budget;
mod goal;
mod todo;
mod transaction;
mod wallet;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::sync::{EntityOperation, OperationKind};

pub use budget::{Budget, BudgetPeriod, BudgetUpdate, NewBudget};
pub use goal::{Goal, GoalUpdate, NewGoal};
pub use todo::{Category, NewTodo, Priority, Todo, TodoUpdate};
pub use transaction::{NewTransaction, Transaction, TransactionType, TransactionUpdate};
pub use wallet::{NewWallet, Wallet, WalletType, WalletUpdate};

/// The entity kinds the overlay manages uniformly.
pub const ENTITY_KINDS: [EntityKind; 5] = [
    EntityKind::Todo,
    EntityKind::Budget,
    EntityKind::Transaction,
    EntityKind::Wallet,
    EntityKind::Goal,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Todo,
    Budget,
    Transaction,
    Wallet,
    Goal,
}

impl EntityKind {
    /// Collection name; doubles as the remote table and the cache key stem.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Todo => "todos",
            Self::Budget => "budgets",
            Self::Transaction => "transactions",
            Self::Wallet => "wallets",
            Self::Goal => "goals",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Budget => "budget",
            Self::Transaction => "transaction",
            Self::Wallet => "wallet",
            Self::Goal => "goal",
        }
    }

    /// Capitalized name used in user-facing status messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::Budget => "Budget",
            Self::Transaction => "Transaction",
            Self::Wallet => "Wallet",
            Self::Goal => "Goal",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Keeps an explicit `null` apart from a missing field: `Some(None)` clears.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A record type the overlay can cache, mutate and queue.
///
/// `Draft` is the caller-supplied field set for a create. `Patch` is the
/// partial update; it must serialize only the fields being changed, since
/// the serialized object is shallow-merged into the cached record as is.
pub trait SyncedEntity:
    Serialize + DeserializeOwned + Clone + fmt::Debug + PartialEq + Send + Sync + 'static
{
    type Draft: Serialize + DeserializeOwned + Clone + fmt::Debug + PartialEq + Send + Sync + 'static;
    type Patch: Serialize + DeserializeOwned + Clone + fmt::Debug + PartialEq + Send + Sync + 'static;

    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Builds the optimistic record for a draft under a locally generated id.
    fn from_draft(id: String, draft: &Self::Draft, now_ms: i64) -> Self;

    /// Applies kind-specific rules a patch must carry before it is used.
    ///
    /// The result is both merged into the cache and sent to the backend.
    fn normalize_patch(patch: Self::Patch) -> Self::Patch {
        patch
    }

    /// Tags an operation on this kind for the pending queue.
    fn into_pending(op: EntityOperation<Self>) -> OperationKind;
}
