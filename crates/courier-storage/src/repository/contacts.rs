//! Contact repository

use courier_common::types::{ContactId, TenantId};
use sqlx::PgPool;

use crate::models::{Contact, ContactCustomValue};

/// Contact repository
#[derive(Clone)]
pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    /// Create a new contact repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All contacts of a tenant
    pub async fn list_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<Contact>, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE tenant_id = $1 ORDER BY created_at ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Custom field values for a set of contacts
    pub async fn custom_values_for(
        &self,
        contact_ids: &[ContactId],
    ) -> Result<Vec<ContactCustomValue>, sqlx::Error> {
        sqlx::query_as::<_, ContactCustomValue>(
            "SELECT * FROM contact_custom_values WHERE contact_id = ANY($1)",
        )
        .bind(contact_ids)
        .fetch_all(&self.pool)
        .await
    }
}
