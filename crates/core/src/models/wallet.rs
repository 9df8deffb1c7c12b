use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntityKind, SyncedEntity};
use crate::sync::{EntityOperation, OperationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Cash,
    Debit,
    Credit,
    Digital,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WalletType,
    pub balance: Decimal,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub color: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWallet {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WalletType,
    pub balance: Decimal,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<WalletType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl WalletUpdate {
    pub fn balance(balance: Decimal) -> Self {
        Self {
            balance: Some(balance),
            ..Default::default()
        }
    }
}

impl SyncedEntity for Wallet {
    type Draft = NewWallet;
    type Patch = WalletUpdate;

    const KIND: EntityKind = EntityKind::Wallet;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: &NewWallet, now_ms: i64) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            kind: draft.kind,
            balance: draft.balance,
            color: draft.color.clone(),
            created_at: now_ms,
        }
    }

    fn into_pending(op: EntityOperation<Self>) -> OperationKind {
        OperationKind::Wallet(op)
    }
}
