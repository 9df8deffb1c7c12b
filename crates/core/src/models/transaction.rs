use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntityKind, SyncedEntity};
use crate::sync::{EntityOperation, OperationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    /// Signed effect of `amount` on the source wallet's balance.
    pub fn balance_delta(&self, amount: Decimal) -> Decimal {
        match self {
            Self::Income => amount,
            Self::Expense | Self::Transfer => -amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Decimal,
    pub category: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub description: String,
    /// Booking date as entered, `YYYY-MM-DD`.
    pub date: String,
    pub wallet_id: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Decimal,
    pub category: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub description: String,
    pub date: String,
    pub wallet_id: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TransactionUpdate {
    /// A patch that rewrites every editable field back to `tx`.
    pub fn restoring(tx: &Transaction) -> Self {
        Self {
            kind: Some(tx.kind),
            amount: Some(tx.amount),
            category: Some(tx.category.clone()),
            description: Some(tx.description.clone()),
            date: Some(tx.date.clone()),
            wallet_id: Some(tx.wallet_id.clone()),
            tags: Some(tx.tags.clone()),
        }
    }
}

impl Transaction {
    /// The record after applying `patch` field by field.
    pub fn patched(&self, patch: &TransactionUpdate) -> Self {
        Self {
            id: self.id.clone(),
            kind: patch.kind.unwrap_or(self.kind),
            amount: patch.amount.unwrap_or(self.amount),
            category: patch
                .category
                .clone()
                .unwrap_or_else(|| self.category.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            date: patch.date.clone().unwrap_or_else(|| self.date.clone()),
            wallet_id: patch
                .wallet_id
                .clone()
                .unwrap_or_else(|| self.wallet_id.clone()),
            tags: patch.tags.clone().unwrap_or_else(|| self.tags.clone()),
            created_at: self.created_at,
        }
    }
}

impl SyncedEntity for Transaction {
    type Draft = NewTransaction;
    type Patch = TransactionUpdate;

    const KIND: EntityKind = EntityKind::Transaction;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: &NewTransaction, now_ms: i64) -> Self {
        Self {
            id,
            kind: draft.kind,
            amount: draft.amount,
            category: draft.category.clone(),
            description: draft.description.clone(),
            date: draft.date.clone(),
            wallet_id: draft.wallet_id.clone(),
            tags: draft.tags.clone(),
            created_at: Some(now_ms),
        }
    }

    fn into_pending(op: EntityOperation<Self>) -> OperationKind {
        OperationKind::Transaction(op)
    }
}
