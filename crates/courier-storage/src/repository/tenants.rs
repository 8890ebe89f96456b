//! Tenant repository

use courier_common::types::TenantId;
use sqlx::PgPool;

use crate::models::Tenant;

/// Tenant repository
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    /// Create a new tenant repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a tenant by ID
    pub async fn get(&self, id: TenantId) -> Result<Option<Tenant>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get an active tenant by API key
    pub async fn get_by_api_key(&self, api_key: &str) -> Result<Option<Tenant>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(
            "SELECT * FROM tenants WHERE api_key = $1 AND status = 'active'",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await
    }
}
