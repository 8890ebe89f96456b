//! Common types for Courier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for tenants
pub type TenantId = Uuid;

/// Unique identifier for outbound messages
pub type MessageId = Uuid;

/// Unique identifier for providers
pub type ProviderId = Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for campaign rules
pub type CampaignRuleId = Uuid;

/// Unique identifier for contacts
pub type ContactId = Uuid;

/// Unique identifier for custom fields
pub type CustomFieldId = Uuid;

/// Unique identifier for recharges
pub type RechargeId = Uuid;

/// Unique identifier for subscriptions
pub type SubscriptionId = Uuid;

/// Unique identifier for plans
pub type PlanId = Uuid;

/// Unique identifier for dispatch jobs
pub type JobId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// Explicit per-request context threaded through ledger and dispatch calls.
///
/// There is deliberately no ambient/global request state; every entry point
/// that acts on behalf of a tenant takes one of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub correlation_id: Uuid,
}

impl RequestContext {
    /// Create a context for a tenant with a fresh correlation id
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            correlation_id: Uuid::new_v4(),
        }
    }
}

/// Canonical message status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Queued,
    Sent,
    Failed,
    Unknown,
}

impl MessageStatus {
    /// Parse a canonical status string; anything unrecognized is `Unknown`
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => MessageStatus::Queued,
            "sent" => MessageStatus::Sent,
            "failed" => MessageStatus::Failed,
            _ => MessageStatus::Unknown,
        }
    }

    /// Terminal statuses never transition again via dispatch
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Sent | MessageStatus::Failed)
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Queued => write!(f, "queued"),
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Failed => write!(f, "failed"),
            MessageStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Downstream delivery status reported by providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Queued,
    Delivered,
    Undelivered,
    Unknown,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Queued => write!(f, "queued"),
            DeliveryStatus::Delivered => write!(f, "delivered"),
            DeliveryStatus::Undelivered => write!(f, "undelivered"),
            DeliveryStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Message content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    PlainText,
    Unicode,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::PlainText => write!(f, "plain_text"),
            ContentType::Unicode => write!(f, "unicode"),
        }
    }
}

/// Campaign rule condition vocabulary.
///
/// Stored as free-form strings in configuration; anything outside the known
/// set parses to `Unsupported`, which always evaluates to ineligible rather
/// than failing the scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionType {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    StartsWith,
    EndsWith,
    IsEmpty,
    NotEmpty,
    Unsupported,
}

impl ConditionType {
    /// Parse a condition type string
    pub fn parse(s: &str) -> Self {
        match s {
            "equals" => ConditionType::Equals,
            "not_equals" => ConditionType::NotEquals,
            "contains" => ConditionType::Contains,
            "greater_than" => ConditionType::GreaterThan,
            "less_than" => ConditionType::LessThan,
            "starts_with" => ConditionType::StartsWith,
            "ends_with" => ConditionType::EndsWith,
            "is_empty" => ConditionType::IsEmpty,
            "not_empty" => ConditionType::NotEmpty,
            _ => ConditionType::Unsupported,
        }
    }
}

/// Campaign recurrence frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "DAILY"),
            Frequency::Weekly => write!(f, "WEEKLY"),
        }
    }
}

/// A national-format phone number plus its country calling code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// Country calling code without the leading plus, e.g. "57"
    pub country_code: String,
    /// Subscriber number in national format
    pub national: String,
}

impl PhoneNumber {
    /// Create a new phone number
    pub fn new(country_code: impl Into<String>, national: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            national: national.into(),
        }
    }

    /// E.164 representation, e.g. "+573001234567"
    pub fn e164(&self) -> String {
        format!("+{}{}", self.country_code, self.national)
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}{}", self.country_code, self.national)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_status_roundtrip() {
        assert_eq!(MessageStatus::parse("sent"), MessageStatus::Sent);
        assert_eq!(MessageStatus::parse("queued"), MessageStatus::Queued);
        assert_eq!(MessageStatus::parse("bogus"), MessageStatus::Unknown);
        assert_eq!(MessageStatus::Sent.to_string(), "sent");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(MessageStatus::Sent.is_terminal());
        assert!(MessageStatus::Failed.is_terminal());
        assert!(!MessageStatus::Queued.is_terminal());
        assert!(!MessageStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_condition_type_parse() {
        assert_eq!(ConditionType::parse("equals"), ConditionType::Equals);
        assert_eq!(ConditionType::parse("not_empty"), ConditionType::NotEmpty);
        assert_eq!(
            ConditionType::parse("matches_regex"),
            ConditionType::Unsupported
        );
    }

    #[test]
    fn test_phone_number_e164() {
        let phone = PhoneNumber::new("57", "3001234567");
        assert_eq!(phone.e164(), "+573001234567");
        assert_eq!(phone.to_string(), "+573001234567");
    }
}
