use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntityKind, SyncedEntity};
use crate::sync::{EntityOperation, OperationKind};

/// Savings target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub target_amount: Decimal,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub saved_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub color: String,
    pub created_at: i64,
}

impl Goal {
    pub fn is_achieved(&self) -> bool {
        self.saved_amount >= self.target_amount
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGoal {
    pub name: String,
    pub target_amount: Decimal,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub saved_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl GoalUpdate {
    pub fn saved_amount(saved: Decimal) -> Self {
        Self {
            saved_amount: Some(saved),
            ..Default::default()
        }
    }
}

impl SyncedEntity for Goal {
    type Draft = NewGoal;
    type Patch = GoalUpdate;

    const KIND: EntityKind = EntityKind::Goal;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: &NewGoal, now_ms: i64) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            target_amount: draft.target_amount,
            saved_amount: draft.saved_amount,
            deadline: draft.deadline.clone(),
            color: draft.color.clone(),
            created_at: now_ms,
        }
    }

    fn into_pending(op: EntityOperation<Self>) -> OperationKind {
        OperationKind::Goal(op)
    }
}
