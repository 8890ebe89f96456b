//! Provider registry repository

use courier_common::types::ProviderId;
use sqlx::PgPool;

use crate::models::Provider;

/// Provider registry repository
#[derive(Clone)]
pub struct ProviderRepository {
    pool: PgPool,
}

impl ProviderRepository {
    /// Create a new provider repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a provider by ID
    pub async fn get(&self, id: ProviderId) -> Result<Option<Provider>, sqlx::Error> {
        sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Providers configured for a channel, ascending by priority.
    /// Ties break by insertion order of the channel assignment.
    pub async fn list_for_channel(&self, channel: &str) -> Result<Vec<Provider>, sqlx::Error> {
        sqlx::query_as::<_, Provider>(
            r#"
            SELECT p.* FROM providers p
            JOIN channel_providers cp ON cp.provider_id = p.id
            WHERE cp.channel = $1
            ORDER BY cp.priority ASC, cp.created_at ASC
            "#,
        )
        .bind(channel)
        .fetch_all(&self.pool)
        .await
    }
}
