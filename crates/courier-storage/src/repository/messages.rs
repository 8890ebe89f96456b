//! Outbound message repository

use chrono::{DateTime, Utc};
use courier_common::types::{MessageId, ProviderId, RechargeId, TenantId};
use sqlx::postgres::PgConnection;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CreateOutboundMessage, OutboundMessage};

/// Outbound message repository
#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a queued message
    pub async fn create_queued(
        &self,
        input: CreateOutboundMessage,
    ) -> Result<OutboundMessage, sqlx::Error> {
        let id = Uuid::now_v7();

        sqlx::query_as::<_, OutboundMessage>(
            r#"
            INSERT INTO outbound_messages (
                id, tenant_id, campaign_id, recipient, country_code,
                content, content_type, status, delivery_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'queued', 'pending')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.tenant_id)
        .bind(input.campaign_id)
        .bind(&input.recipient)
        .bind(&input.country_code)
        .bind(&input.content)
        .bind(&input.content_type)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a message by ID
    pub async fn get(&self, id: MessageId) -> Result<Option<OutboundMessage>, sqlx::Error> {
        sqlx::query_as::<_, OutboundMessage>("SELECT * FROM outbound_messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Load a batch of messages by id, tenant-scoped
    pub async fn get_batch(
        &self,
        tenant_id: TenantId,
        ids: &[MessageId],
    ) -> Result<Vec<OutboundMessage>, sqlx::Error> {
        sqlx::query_as::<_, OutboundMessage>(
            "SELECT * FROM outbound_messages WHERE tenant_id = $1 AND id = ANY($2)",
        )
        .bind(tenant_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark a message sent with the provider attribution and raw response
    #[allow(clippy::too_many_arguments)]
    pub async fn mark_sent(
        &self,
        id: MessageId,
        provider_id: ProviderId,
        provider_message_id: Option<&str>,
        delivery_status: &str,
        delivery_details: Option<&str>,
        raw_response: &serde_json::Value,
        sent_at: DateTime<Utc>,
    ) -> Result<Option<OutboundMessage>, sqlx::Error> {
        sqlx::query_as::<_, OutboundMessage>(
            r#"
            UPDATE outbound_messages SET
                status = 'sent',
                provider_id = $2,
                provider_message_id = $3,
                delivery_status = $4,
                delivery_details = $5,
                provider_raw_response = $6,
                sent_at = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(provider_id)
        .bind(provider_message_id)
        .bind(delivery_status)
        .bind(delivery_details)
        .bind(raw_response)
        .bind(sent_at)
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark messages failed after the failover chain is exhausted
    pub async fn mark_failed(
        &self,
        ids: &[MessageId],
        error: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE outbound_messages SET
                status = 'failed',
                delivery_status = 'undelivered',
                delivery_details = $2,
                updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Attach the funding recharge to a message, inside the metering transaction
    pub async fn attach_recharge(
        conn: &mut PgConnection,
        id: MessageId,
        recharge_id: RechargeId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE outbound_messages SET recharge_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(recharge_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Apply a delivery update keyed by the provider-assigned message id
    pub async fn update_delivery_by_provider_message_id(
        &self,
        provider_message_id: &str,
        status: &str,
        delivery_status: &str,
        delivery_details: Option<&str>,
        raw_payload: &serde_json::Value,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE outbound_messages SET
                status = $2,
                delivery_status = $3,
                delivery_details = $4,
                provider_raw_response = $5,
                updated_at = NOW()
            WHERE provider_message_id = $1
            "#,
        )
        .bind(provider_message_id)
        .bind(status)
        .bind(delivery_status)
        .bind(delivery_details)
        .bind(raw_payload)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Sent messages still awaiting a terminal delivery status, oldest first
    pub async fn list_awaiting_delivery(
        &self,
        limit: i64,
    ) -> Result<Vec<OutboundMessage>, sqlx::Error> {
        sqlx::query_as::<_, OutboundMessage>(
            r#"
            SELECT * FROM outbound_messages
            WHERE status = 'sent'
              AND delivery_status IN ('pending', 'queued')
              AND provider_message_id IS NOT NULL
            ORDER BY sent_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
