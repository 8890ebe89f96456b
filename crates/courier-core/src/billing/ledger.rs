//! Cost metering against prepaid recharges and the subscription quota
//!
//! Metering is strictly prepaid: every deduction is planned, applied and
//! committed before a single provider request goes out, and a failed send
//! never refunds. The draw-down order is ascending by remaining balance,
//! smallest recharge drained first. Residual cost not covered by recharges
//! converts to subscription usage, rejected when it would exceed the plan
//! limit.

use courier_common::types::{MessageId, RechargeId, RequestContext};
use courier_storage::repository::{BillingRepository, MessageRepository};
use courier_storage::{DatabasePool, UnitOfWork};
use thiserror::Error;
use tracing::info;

/// Metering failure. `InsufficientBalance` aborts the batch before any
/// provider contact.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("insufficient balance: batch needs {required_units} subscription messages, {available_units} remain")]
    InsufficientBalance {
        required_units: i64,
        available_units: i64,
    },

    #[error("tenant has no active subscription")]
    NoActiveSubscription,

    #[error("plan price per message must be positive")]
    InvalidPrice,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A recharge balance as seen by the planner
#[derive(Debug, Clone)]
pub struct RechargeBalance {
    pub id: RechargeId,
    pub remaining_amount: i64,
}

/// One deduction against one recharge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechargeDraw {
    pub recharge_id: RechargeId,
    pub amount: i64,
}

/// How a single message is funded
#[derive(Debug, Clone)]
pub struct MessageFunding {
    pub message_id: MessageId,
    pub draws: Vec<RechargeDraw>,
    /// Messages charged to the subscription for this message's residual
    pub subscription_units: i64,
}

/// Funding plan for a whole batch
#[derive(Debug, Clone)]
pub struct FundingPlan {
    pub per_message: Vec<MessageFunding>,
    /// Total amount drawn from recharges
    pub recharge_total: i64,
    /// Total subscription usage increment
    pub subscription_units: i64,
}

/// Plan the funding for a batch. Pure: operates on balances already
/// loaded (and locked) by the caller.
pub fn plan_funding(
    message_ids: &[MessageId],
    message_cost: i64,
    recharges: &[RechargeBalance],
    message_usage: i64,
    message_limit: i64,
) -> Result<FundingPlan, LedgerError> {
    if message_cost <= 0 {
        return Err(LedgerError::InvalidPrice);
    }

    // Draw-down policy: smallest balance first, ties in caller order
    let mut recharges: Vec<&RechargeBalance> = recharges.iter().collect();
    recharges.sort_by_key(|r| r.remaining_amount);

    let mut balances: Vec<i64> = recharges.iter().map(|r| r.remaining_amount).collect();
    let mut index = 0usize;

    let mut per_message = Vec::with_capacity(message_ids.len());
    let mut recharge_total = 0i64;
    let mut subscription_units = 0i64;

    for &message_id in message_ids {
        let mut cost_remaining = message_cost;
        let mut draws = Vec::new();

        while index < recharges.len() && cost_remaining > 0 {
            let available = balances[index];
            let deduct = cost_remaining.min(available);

            if deduct > 0 {
                draws.push(RechargeDraw {
                    recharge_id: recharges[index].id,
                    amount: deduct,
                });
                balances[index] -= deduct;
                cost_remaining -= deduct;
                recharge_total += deduct;
            }

            if balances[index] == 0 {
                index += 1;
            }
        }

        // Residual rounds up to whole subscription messages
        let units = if cost_remaining > 0 {
            (cost_remaining + message_cost - 1) / message_cost
        } else {
            0
        };
        subscription_units += units;

        per_message.push(MessageFunding {
            message_id,
            draws,
            subscription_units: units,
        });
    }

    if subscription_units > 0 && message_usage + subscription_units > message_limit {
        return Err(LedgerError::InsufficientBalance {
            required_units: subscription_units,
            available_units: (message_limit - message_usage).max(0),
        });
    }

    Ok(FundingPlan {
        per_message,
        recharge_total,
        subscription_units,
    })
}

/// The billing ledger: plans funding and applies it atomically
#[derive(Clone)]
pub struct BillingLedger {
    db: DatabasePool,
}

impl BillingLedger {
    /// Create a new billing ledger
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    /// Meter a batch inside one transaction.
    ///
    /// Row locks on the subscription and recharge rows serialize concurrent
    /// batches for the same tenant. The transaction never spans a provider
    /// call: it commits here, then sends happen.
    pub async fn meter(
        &self,
        ctx: &RequestContext,
        message_ids: &[MessageId],
    ) -> Result<FundingPlan, LedgerError> {
        let mut uow = UnitOfWork::begin(self.db.pool()).await?;

        let subscription = BillingRepository::lock_subscription(uow.conn(), ctx.tenant_id)
            .await?
            .ok_or(LedgerError::NoActiveSubscription)?;

        let recharges = BillingRepository::lock_recharges(uow.conn(), ctx.tenant_id).await?;
        let balances: Vec<RechargeBalance> = recharges
            .iter()
            .map(|r| RechargeBalance {
                id: r.id,
                remaining_amount: r.remaining_amount,
            })
            .collect();

        let plan = plan_funding(
            message_ids,
            subscription.price_per_message,
            &balances,
            subscription.message_usage,
            subscription.message_limit,
        )?;

        for funding in &plan.per_message {
            for draw in &funding.draws {
                BillingRepository::apply_recharge_draw(uow.conn(), draw.recharge_id, draw.amount, 1)
                    .await?;
                MessageRepository::attach_recharge(uow.conn(), funding.message_id, draw.recharge_id)
                    .await?;
            }
        }

        if plan.subscription_units > 0 {
            BillingRepository::increment_usage(uow.conn(), subscription.id, plan.subscription_units)
                .await?;
        }

        // Audit trail goes out only once the deductions are durable
        let tenant_id = ctx.tenant_id;
        let correlation_id = ctx.correlation_id;
        let message_count = message_ids.len();
        let recharge_total = plan.recharge_total;
        let subscription_units = plan.subscription_units;
        uow.after_commit(move || {
            info!(
                %tenant_id,
                %correlation_id,
                message_count,
                recharge_total,
                subscription_units,
                "batch metered"
            );
        });

        uow.commit().await?;

        Ok(plan)
    }
}
