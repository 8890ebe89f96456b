//! Database models

use chrono::{DateTime, Utc};
use courier_common::types::{
    CampaignId, CampaignRuleId, ContactId, CustomFieldId, JobId, MessageId, PlanId, ProviderId,
    RechargeId, SubscriptionId, TenantId,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Tenant model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub api_key: String,
    /// Default country calling code applied to messages without one
    pub country_code: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outbound message model (canonical message)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: MessageId,
    pub tenant_id: TenantId,
    pub campaign_id: Option<CampaignId>,
    pub recipient: String,
    pub country_code: Option<String>,
    pub content: String,
    pub content_type: String,
    pub status: String,
    pub delivery_status: String,
    pub delivery_details: Option<String>,
    pub provider_id: Option<ProviderId>,
    pub provider_message_id: Option<String>,
    pub provider_raw_response: Option<serde_json::Value>,
    pub recharge_id: Option<RechargeId>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provider registry row. `config` holds the full declarative
/// `ProviderConfig` (credentials, headers, endpoints, mappings) as jsonb.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    /// Adapter registry key: "mapped", "url_template" or "form"
    pub adapter: String,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Channel-to-provider assignment with failover priority
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChannelProvider {
    pub id: uuid::Uuid,
    pub channel: String,
    pub provider_id: ProviderId,
    /// Lower numbers are tried first
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

/// Prepaid recharge model. Amounts are i64 minor units (cents).
/// Drained to zero and kept as a zeroed record, never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Recharge {
    pub id: RechargeId,
    pub tenant_id: TenantId,
    pub amount: i64,
    pub remaining_amount: i64,
    pub remaining_messages: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Plan model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub message_limit: i64,
    /// Cost per message in minor units (cents)
    pub price_per_message: i64,
    pub created_at: DateTime<Utc>,
}

/// Subscription model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub plan_id: PlanId,
    pub message_usage: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription joined with its plan, as loaded by the ledger
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubscriptionWithPlan {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub plan_id: PlanId,
    pub message_usage: i64,
    pub status: String,
    pub message_limit: i64,
    pub price_per_message: i64,
}

/// Campaign model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub content_type: String,
    pub channel: String,
    pub status: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    /// Compiled recurrence rule string, e.g. "FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=9;BYMINUTE=30"
    pub recurrence: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Campaign rule model. All rules of a campaign must hold (AND) for a
/// contact to be eligible.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampaignRule {
    pub id: CampaignRuleId,
    pub campaign_id: CampaignId,
    pub custom_field_id: CustomFieldId,
    pub condition_type: String,
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Contact model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub tenant_id: TenantId,
    pub name: String,
    pub last_name: Option<String>,
    pub phone: String,
    pub country_code: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Custom field value attached to a contact
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContactCustomValue {
    pub id: uuid::Uuid,
    pub contact_id: ContactId,
    pub custom_field_id: CustomFieldId,
    pub value: serde_json::Value,
}

/// Durable work queue row for dispatch batches
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DispatchJob {
    pub id: JobId,
    pub queue: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a queued outbound message
#[derive(Debug, Clone)]
pub struct CreateOutboundMessage {
    pub tenant_id: TenantId,
    pub campaign_id: Option<CampaignId>,
    pub recipient: String,
    pub country_code: Option<String>,
    pub content: String,
    pub content_type: String,
}
