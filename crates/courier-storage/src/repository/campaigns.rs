//! Campaign repository

use chrono::{DateTime, Utc};
use courier_common::types::CampaignId;
use sqlx::PgPool;

use crate::models::{Campaign, CampaignRule};

/// Campaign repository
#[derive(Clone)]
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    /// Create a new campaign repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a campaign by ID
    pub async fn get(&self, id: CampaignId) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Active campaigns whose start/end bounds contain the given instant
    pub async fn list_active_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(
            r#"
            SELECT * FROM campaigns
            WHERE status = 'active'
              AND starts_at <= $1
              AND (ends_at IS NULL OR ends_at >= $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    /// Rules attached to a campaign
    pub async fn rules_for(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<CampaignRule>, sqlx::Error> {
        sqlx::query_as::<_, CampaignRule>(
            "SELECT * FROM campaign_rules WHERE campaign_id = $1 ORDER BY created_at ASC",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
    }
}
