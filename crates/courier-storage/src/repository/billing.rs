//! Billing repository - recharge and subscription rows
//!
//! Every query here runs on the metering transaction's connection. The
//! `FOR UPDATE` locks serialize concurrent batches for the same tenant.

use courier_common::types::{RechargeId, SubscriptionId, TenantId};
use sqlx::postgres::PgConnection;

use crate::models::{Recharge, SubscriptionWithPlan};

/// Billing repository
#[derive(Clone)]
pub struct BillingRepository;

impl BillingRepository {
    /// Accepted recharges with a positive balance, smallest balance first,
    /// locked for the duration of the metering transaction.
    pub async fn lock_recharges(
        conn: &mut PgConnection,
        tenant_id: TenantId,
    ) -> Result<Vec<Recharge>, sqlx::Error> {
        sqlx::query_as::<_, Recharge>(
            r#"
            SELECT * FROM recharges
            WHERE tenant_id = $1
              AND status = 'accepted'
              AND remaining_amount > 0
            ORDER BY remaining_amount ASC
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .fetch_all(conn)
        .await
    }

    /// The tenant's active subscription joined with its plan, row-locked.
    pub async fn lock_subscription(
        conn: &mut PgConnection,
        tenant_id: TenantId,
    ) -> Result<Option<SubscriptionWithPlan>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionWithPlan>(
            r#"
            SELECT s.id, s.tenant_id, s.plan_id, s.message_usage, s.status,
                   p.message_limit, p.price_per_message
            FROM subscriptions s
            JOIN plans p ON p.id = s.plan_id
            WHERE s.tenant_id = $1 AND s.status = 'active'
            FOR UPDATE OF s
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(conn)
        .await
    }

    /// Deduct a draw from a recharge's balance and message count
    pub async fn apply_recharge_draw(
        conn: &mut PgConnection,
        recharge_id: RechargeId,
        amount: i64,
        messages: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE recharges SET
                remaining_amount = remaining_amount - $2,
                remaining_messages = remaining_messages - $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(recharge_id)
        .bind(amount)
        .bind(messages)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Increment subscription usage by the given number of message units
    pub async fn increment_usage(
        conn: &mut PgConnection,
        subscription_id: SubscriptionId,
        units: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE subscriptions SET
                message_usage = message_usage + $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(subscription_id)
        .bind(units)
        .execute(conn)
        .await?;

        Ok(())
    }
}
