use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntityKind, SyncedEntity};
use crate::sync::{EntityOperation, OperationKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

/// Spending cap for one transaction category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub category: String,
    pub limit_amount: Decimal,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub spent: Decimal,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub period: BudgetPeriod,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBudget {
    pub category: String,
    pub limit_amount: Decimal,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<BudgetPeriod>,
}

impl BudgetUpdate {
    pub fn spent(spent: Decimal) -> Self {
        Self {
            spent: Some(spent),
            ..Default::default()
        }
    }
}

impl SyncedEntity for Budget {
    type Draft = NewBudget;
    type Patch = BudgetUpdate;

    const KIND: EntityKind = EntityKind::Budget;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: &NewBudget, now_ms: i64) -> Self {
        Self {
            id,
            category: draft.category.clone(),
            limit_amount: draft.limit_amount,
            spent: Decimal::ZERO,
            period: draft.period,
            created_at: now_ms,
        }
    }

    fn into_pending(op: EntityOperation<Self>) -> OperationKind {
        OperationKind::Budget(op)
    }
}
