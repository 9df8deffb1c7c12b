use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::models::{Goal, Transaction, TransactionUpdate};

/// How to undo one applied step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Compensation {
    RemoveTransaction { id: String },
    RestoreTransaction { transaction: Transaction },
    RevertTransaction { id: String, patch: TransactionUpdate },
    RestoreWalletBalance { wallet_id: String, balance: Decimal },
    RestoreBudgetSpent { budget_id: String, spent: Decimal },
    RestoreGoalSaved { goal_id: String, saved: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedStep {
    pub description: String,
    pub compensation: Compensation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedStep {
    pub description: String,
    pub error: String,
}

/// Steps a composite action got through, in order, and where it stopped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeOutcome {
    pub applied: Vec<AppliedStep>,
    pub failed: Option<FailedStep>,
}

impl CompositeOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }

    /// Some steps landed before a later one failed.
    pub fn is_partially_applied(&self) -> bool {
        self.failed.is_some() && !self.applied.is_empty()
    }

    pub(super) fn push(&mut self, description: impl Into<String>, compensation: Compensation) {
        self.applied.push(AppliedStep {
            description: description.into(),
            compensation,
        });
    }

    pub(super) fn fail(&mut self, description: impl Into<String>, error: &Error) {
        self.failed = Some(FailedStep {
            description: description.into(),
            error: error.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionChange {
    /// The transaction as written, when the transaction step itself landed.
    pub transaction: Option<Transaction>,
    pub outcome: CompositeOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalContribution {
    pub goal: Option<Goal>,
    pub achieved: bool,
    pub outcome: CompositeOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    /// Descriptions of the undone steps, most recent first.
    pub reverted: Vec<String>,
    pub failed: Option<FailedStep>,
}

impl RollbackReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}
