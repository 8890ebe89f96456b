//! Adapter capability contract and canonical outcome types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::types::{MessageId, MessageStatus, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::mapping::MappingError;
use super::config::ProviderConfig;

/// A single message handed to an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchInput {
    pub id: MessageId,
    pub tenant_id: TenantId,
    pub recipient: String,
    pub country_code: String,
    pub content: String,
    pub channel: String,
}

/// Canonical outcome of a provider operation for one message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageOutcome {
    #[serde(default)]
    pub id: Option<MessageId>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    pub status: MessageStatus,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default = "default_delivery_status")]
    pub delivery_status: String,
    #[serde(default)]
    pub delivery_details: Option<String>,
    #[serde(default)]
    pub provider_raw_response: Value,
    #[serde(default)]
    pub provider_message_id: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_message_type")]
    pub message_type: String,
}

fn default_delivery_status() -> String {
    "queued".to_string()
}

fn default_priority() -> i32 {
    1
}

fn default_message_type() -> String {
    "text".to_string()
}

/// Result of a batch send: accepted outcomes plus the inputs the provider
/// rejected per-recipient. Rejections here do NOT fail the invocation;
/// they move on to the next provider in the chain.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub sent: Vec<MessageOutcome>,
    pub failed: Vec<DispatchInput>,
}

/// Adapter-level failure. Transport and soft failures fail the whole
/// invocation and trigger failover.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx response carrying a provider-declared error code
    #[error("provider error {code}: {reason}")]
    SoftFailure { code: String, reason: String },

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("endpoint \"{0}\" is not configured for this provider")]
    MissingEndpoint(&'static str),

    #[error("operation \"{0}\" is not supported by this adapter")]
    Unsupported(&'static str),

    #[error("no adapter registered under \"{0}\"")]
    UnknownAdapter(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        AdapterError::Transport(e.to_string())
    }
}

/// Uniform capability set every provider integration implements
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Send one message
    async fn send_single(
        &self,
        input: &DispatchInput,
        config: &ProviderConfig,
    ) -> Result<MessageOutcome, AdapterError>;

    /// Send a batch; per-recipient rejections come back in `failed`
    async fn send_batch(
        &self,
        inputs: &[DispatchInput],
        config: &ProviderConfig,
    ) -> Result<BatchOutcome, AdapterError>;

    /// Pull delivery status for a provider-assigned message id
    async fn get_status(
        &self,
        message_id: &str,
        config: &ProviderConfig,
    ) -> Result<MessageOutcome, AdapterError>;
}
