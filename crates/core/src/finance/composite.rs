use std::sync::Arc;

use log::{debug, info, warn};
use rust_decimal::Decimal;

use super::saga::{
    Compensation, CompositeOutcome, FailedStep, GoalContribution, RollbackReport,
    TransactionChange,
};
use crate::errors::{Error, Result};
use crate::models::{
    Budget, BudgetUpdate, EntityKind, Goal, GoalUpdate, NewTransaction, SyncedEntity, Transaction,
    TransactionType, TransactionUpdate, Wallet, WalletUpdate,
};
use crate::sync::SyncOverlay;

/// A follow-up balance change triggered by a transaction.
#[derive(Debug, Clone)]
enum Adjustment {
    Wallet { wallet_id: String, delta: Decimal },
    Budget { category: String, delta: Decimal },
}

impl Adjustment {
    fn describe(&self) -> String {
        match self {
            Self::Wallet { wallet_id, delta } => {
                format!("adjust wallet {} balance by {}", wallet_id, delta)
            }
            Self::Budget { category, delta } => {
                format!("adjust '{}' budget spent by {}", category, delta)
            }
        }
    }
}

fn wallet_effect(tx: &Transaction) -> Adjustment {
    Adjustment::Wallet {
        wallet_id: tx.wallet_id.clone(),
        delta: tx.kind.balance_delta(tx.amount),
    }
}

fn wallet_reversal(tx: &Transaction) -> Adjustment {
    Adjustment::Wallet {
        wallet_id: tx.wallet_id.clone(),
        delta: -tx.kind.balance_delta(tx.amount),
    }
}

fn expense_amount(tx: &Transaction) -> Decimal {
    match tx.kind {
        TransactionType::Expense => tx.amount,
        TransactionType::Income | TransactionType::Transfer => Decimal::ZERO,
    }
}

/// Budget changes for replacing `before` with `after`.
fn budget_adjustments(before: &Transaction, after: &Transaction) -> Vec<Adjustment> {
    let (old_spent, new_spent) = (expense_amount(before), expense_amount(after));
    if old_spent.is_zero() && new_spent.is_zero() {
        return Vec::new();
    }
    if before.category != after.category {
        let mut adjustments = Vec::new();
        if !old_spent.is_zero() {
            adjustments.push(Adjustment::Budget {
                category: before.category.clone(),
                delta: -old_spent,
            });
        }
        if !new_spent.is_zero() {
            adjustments.push(Adjustment::Budget {
                category: after.category.clone(),
                delta: new_spent,
            });
        }
        return adjustments;
    }
    if before.amount == after.amount && before.kind == after.kind {
        return Vec::new();
    }
    vec![Adjustment::Budget {
        category: after.category.clone(),
        delta: new_spent - old_spent,
    }]
}

/// Multi-record finance flows run as ordered, compensable steps.
///
/// Each step goes through the overlay and reads the cache afresh, so two
/// steps touching the same wallet see each other's writes. A step that
/// fails stops the chain; the returned outcome lists what landed so the
/// caller can retry or [`rollback`](Self::rollback).
pub struct FinanceActions {
    overlay: Arc<SyncOverlay>,
}

impl FinanceActions {
    pub fn new(overlay: Arc<SyncOverlay>) -> Self {
        Self { overlay }
    }

    /// Records a transaction, then moves the wallet balance and, for an
    /// expense, the matching budget's spent total.
    pub async fn record_transaction(
        &self,
        username: &str,
        draft: NewTransaction,
    ) -> Result<TransactionChange> {
        let mut outcome = CompositeOutcome::default();
        let transaction = match self.overlay.add::<Transaction>(username, draft).await {
            Ok(tx) => tx,
            Err(e) => {
                warn!("[Finance] Recording transaction failed: {}", e);
                outcome.fail("record transaction", &e);
                return Ok(TransactionChange {
                    transaction: None,
                    outcome,
                });
            }
        };
        outcome.push(
            format!("record transaction {}", transaction.id),
            Compensation::RemoveTransaction {
                id: transaction.id.clone(),
            },
        );

        let mut adjustments = vec![wallet_effect(&transaction)];
        if transaction.kind == TransactionType::Expense {
            adjustments.push(Adjustment::Budget {
                category: transaction.category.clone(),
                delta: transaction.amount,
            });
        }
        self.apply(username, adjustments, &mut outcome).await;

        Ok(TransactionChange {
            transaction: Some(transaction),
            outcome,
        })
    }

    /// Rewrites a transaction, undoing its old wallet and budget effects and
    /// applying the new ones.
    pub async fn edit_transaction(
        &self,
        username: &str,
        id: &str,
        updates: TransactionUpdate,
    ) -> Result<TransactionChange> {
        let original = self.require::<Transaction>(username, id)?;
        let edited = original.patched(&updates);
        let mut outcome = CompositeOutcome::default();

        if let Err(e) = self
            .overlay
            .update::<Transaction>(username, id, updates)
            .await
        {
            outcome.fail(format!("update transaction {}", id), &e);
            return Ok(TransactionChange {
                transaction: None,
                outcome,
            });
        }
        outcome.push(
            format!("update transaction {}", id),
            Compensation::RevertTransaction {
                id: id.to_string(),
                patch: TransactionUpdate::restoring(&original),
            },
        );

        let mut adjustments = vec![wallet_reversal(&original), wallet_effect(&edited)];
        adjustments.extend(budget_adjustments(&original, &edited));
        self.apply(username, adjustments, &mut outcome).await;

        Ok(TransactionChange {
            transaction: Some(edited),
            outcome,
        })
    }

    /// Deletes a transaction and reverses its wallet and budget effects.
    pub async fn remove_transaction(&self, username: &str, id: &str) -> Result<TransactionChange> {
        let original = self.require::<Transaction>(username, id)?;
        let mut outcome = CompositeOutcome::default();

        if let Err(e) = self.overlay.delete::<Transaction>(username, id).await {
            outcome.fail(format!("delete transaction {}", id), &e);
            return Ok(TransactionChange {
                transaction: None,
                outcome,
            });
        }
        outcome.push(
            format!("delete transaction {}", id),
            Compensation::RestoreTransaction {
                transaction: original.clone(),
            },
        );

        let mut adjustments = vec![wallet_reversal(&original)];
        if original.kind == TransactionType::Expense {
            adjustments.push(Adjustment::Budget {
                category: original.category.clone(),
                delta: -original.amount,
            });
        }
        self.apply(username, adjustments, &mut outcome).await;

        Ok(TransactionChange {
            transaction: Some(original),
            outcome,
        })
    }

    /// Adds `amount` to a goal's savings, capped at the target.
    pub async fn contribute_to_goal(
        &self,
        username: &str,
        goal_id: &str,
        amount: Decimal,
    ) -> Result<GoalContribution> {
        let goal = self.require::<Goal>(username, goal_id)?;
        let saved = (goal.saved_amount + amount).min(goal.target_amount);
        let mut outcome = CompositeOutcome::default();
        let description = format!("contribute {} to goal {}", amount, goal_id);

        if let Err(e) = self
            .overlay
            .update::<Goal>(username, goal_id, GoalUpdate::saved_amount(saved))
            .await
        {
            outcome.fail(description, &e);
            return Ok(GoalContribution {
                goal: None,
                achieved: false,
                outcome,
            });
        }
        outcome.push(
            description,
            Compensation::RestoreGoalSaved {
                goal_id: goal_id.to_string(),
                saved: goal.saved_amount,
            },
        );

        let updated = Goal {
            saved_amount: saved,
            ..goal
        };
        let achieved = updated.is_achieved();
        if achieved {
            info!("[Finance] Goal '{}' achieved", updated.name);
        }
        Ok(GoalContribution {
            goal: Some(updated),
            achieved,
            outcome,
        })
    }

    /// Undoes the applied steps of `outcome`, most recent first.
    ///
    /// Stops at the first compensation that fails.
    pub async fn rollback(&self, username: &str, outcome: &CompositeOutcome) -> RollbackReport {
        let mut report = RollbackReport::default();
        for step in outcome.applied.iter().rev() {
            match self.compensate(username, &step.compensation).await {
                Ok(()) => report.reverted.push(step.description.clone()),
                Err(e) => {
                    warn!("[Finance] Rolling back '{}' failed: {}", step.description, e);
                    report.failed = Some(FailedStep {
                        description: step.description.clone(),
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }
        report
    }

    fn require<E: SyncedEntity>(&self, username: &str, id: &str) -> Result<E> {
        self.overlay
            .find_cached::<E>(username, id)?
            .ok_or_else(|| Error::not_found(E::KIND, id))
    }

    async fn apply(
        &self,
        username: &str,
        adjustments: Vec<Adjustment>,
        outcome: &mut CompositeOutcome,
    ) {
        for adjustment in adjustments {
            if let Err(e) = self.adjust(username, &adjustment, outcome).await {
                warn!("[Finance] {} failed: {}", adjustment.describe(), e);
                outcome.fail(adjustment.describe(), &e);
                return;
            }
        }
    }

    async fn adjust(
        &self,
        username: &str,
        adjustment: &Adjustment,
        outcome: &mut CompositeOutcome,
    ) -> Result<()> {
        match adjustment {
            Adjustment::Wallet { wallet_id, delta } => {
                let Some(wallet) = self.overlay.find_cached::<Wallet>(username, wallet_id)? else {
                    debug!("[Finance] Wallet {} not cached, skipping", wallet_id);
                    return Ok(());
                };
                let balance = wallet.balance + delta;
                self.overlay
                    .update::<Wallet>(username, &wallet.id, WalletUpdate::balance(balance))
                    .await?;
                outcome.push(
                    adjustment.describe(),
                    Compensation::RestoreWalletBalance {
                        wallet_id: wallet.id,
                        balance: wallet.balance,
                    },
                );
            }
            Adjustment::Budget { category, delta } => {
                let budget = self
                    .overlay
                    .cached::<Budget>(username)?
                    .into_iter()
                    .find(|b| &b.category == category);
                let Some(budget) = budget else {
                    debug!("[Finance] No '{}' budget, skipping", category);
                    return Ok(());
                };
                let spent = (budget.spent + delta).max(Decimal::ZERO);
                self.overlay
                    .update::<Budget>(username, &budget.id, BudgetUpdate::spent(spent))
                    .await?;
                outcome.push(
                    adjustment.describe(),
                    Compensation::RestoreBudgetSpent {
                        budget_id: budget.id,
                        spent: budget.spent,
                    },
                );
            }
        }
        Ok(())
    }

    async fn compensate(&self, username: &str, compensation: &Compensation) -> Result<()> {
        let overlay = &self.overlay;
        match compensation {
            Compensation::RemoveTransaction { id } => {
                overlay.delete::<Transaction>(username, id).await?;
            }
            Compensation::RestoreTransaction { transaction } => {
                overlay.restore(username, transaction.clone()).await?;
            }
            Compensation::RevertTransaction { id, patch } => {
                overlay
                    .update::<Transaction>(username, id, patch.clone())
                    .await?;
            }
            Compensation::RestoreWalletBalance { wallet_id, balance } => {
                overlay
                    .update::<Wallet>(username, wallet_id, WalletUpdate::balance(*balance))
                    .await?;
            }
            Compensation::RestoreBudgetSpent { budget_id, spent } => {
                overlay
                    .update::<Budget>(username, budget_id, BudgetUpdate::spent(*spent))
                    .await?;
            }
            Compensation::RestoreGoalSaved { goal_id, saved } => {
                overlay
                    .update::<Goal>(username, goal_id, GoalUpdate::saved_amount(*saved))
                    .await?;
            }
        }
        debug!(
            "[Finance] Compensated {:?} for {}",
            compensation_kind(compensation),
            username
        );
        Ok(())
    }
}

fn compensation_kind(compensation: &Compensation) -> EntityKind {
    match compensation {
        Compensation::RemoveTransaction { .. }
        | Compensation::RestoreTransaction { .. }
        | Compensation::RevertTransaction { .. } => EntityKind::Transaction,
        Compensation::RestoreWalletBalance { .. } => EntityKind::Wallet,
        Compensation::RestoreBudgetSpent { .. } => EntityKind::Budget,
        Compensation::RestoreGoalSaved { .. } => EntityKind::Goal,
    }
}
