//! Persistence and collaborator seams used by the dispatch coordinator
//!
//! Traits with database-backed implementations, so the coordinator's
//! failover behavior is exercisable against in-memory stores in tests.

use anyhow::Result;
use async_trait::async_trait;
use courier_common::types::{MessageId, ProviderId, RequestContext, TenantId};
use courier_storage::models::Tenant;
use courier_storage::repository::{MessageRepository, TenantRepository};
use chrono::Utc;

use crate::billing::{BillingLedger, FundingPlan, LedgerError};
use crate::providers::{MessageOutcome, ProviderSelector, ResolvedProvider, SelectorError};

/// Tenant lookup
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>>;
}

#[async_trait]
impl TenantStore for TenantRepository {
    async fn get_tenant(&self, id: TenantId) -> Result<Option<Tenant>> {
        Ok(self.get(id).await?)
    }
}

/// Per-message outcome persistence
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a sent outcome with provider attribution
    async fn record_sent(
        &self,
        message_id: MessageId,
        provider_id: ProviderId,
        outcome: &MessageOutcome,
    ) -> Result<()>;

    /// Mark messages failed after the chain is exhausted
    async fn record_failed(&self, message_ids: &[MessageId], error: &str) -> Result<()>;
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn record_sent(
        &self,
        message_id: MessageId,
        provider_id: ProviderId,
        outcome: &MessageOutcome,
    ) -> Result<()> {
        self.mark_sent(
            message_id,
            provider_id,
            outcome.provider_message_id.as_deref(),
            &outcome.delivery_status,
            outcome.delivery_details.as_deref(),
            &outcome.provider_raw_response,
            outcome.sent_at.unwrap_or_else(Utc::now),
        )
        .await?;
        Ok(())
    }

    async fn record_failed(&self, message_ids: &[MessageId], error: &str) -> Result<()> {
        self.mark_failed(message_ids, error).await?;
        Ok(())
    }
}

/// Failover chain resolution for a channel
#[async_trait]
pub trait ChannelResolver: Send + Sync {
    async fn resolve(&self, channel: &str) -> Result<Vec<ResolvedProvider>, SelectorError>;
}

#[async_trait]
impl ChannelResolver for ProviderSelector {
    async fn resolve(&self, channel: &str) -> Result<Vec<ResolvedProvider>, SelectorError> {
        ProviderSelector::resolve(self, channel).await
    }
}

/// Batch metering
#[async_trait]
pub trait Metering: Send + Sync {
    async fn meter(
        &self,
        ctx: &RequestContext,
        message_ids: &[MessageId],
    ) -> Result<FundingPlan, LedgerError>;
}

#[async_trait]
impl Metering for BillingLedger {
    async fn meter(
        &self,
        ctx: &RequestContext,
        message_ids: &[MessageId],
    ) -> Result<FundingPlan, LedgerError> {
        BillingLedger::meter(self, ctx, message_ids).await
    }
}
