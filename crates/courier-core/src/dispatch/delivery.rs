//! Delivery state reconciliation
//!
//! Two paths back into persisted message state: the webhook collaborator
//! pushes pre-validated updates through `apply_delivery_update`, and the
//! status poller pulls `get_status` for providers without a delivery
//! webhook.

use anyhow::Result;
use courier_common::types::MessageStatus;
use courier_storage::repository::{MessageRepository, ProviderRepository};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{debug, error, info, warn};

use crate::providers::{AdapterError, AdapterRegistry, ProviderConfig};

/// Applies delivery updates to persisted messages
#[derive(Clone)]
pub struct DeliveryService {
    messages: MessageRepository,
}

impl DeliveryService {
    /// Create a new delivery service
    pub fn new(messages: MessageRepository) -> Self {
        Self { messages }
    }

    /// Apply a pre-validated delivery update keyed by the provider-assigned
    /// message id. Returns the number of messages updated.
    pub async fn apply_delivery_update(
        &self,
        provider_message_id: &str,
        status: MessageStatus,
        raw_payload: Value,
    ) -> Result<u64> {
        let delivery_status = delivery_status_for(status);

        let updated = self
            .messages
            .update_delivery_by_provider_message_id(
                provider_message_id,
                &status.to_string(),
                delivery_status,
                None,
                &raw_payload,
            )
            .await?;

        if updated == 0 {
            warn!(provider_message_id, "delivery update matched no message");
        } else {
            info!(
                provider_message_id,
                %status,
                "delivery update applied"
            );
        }

        Ok(updated)
    }
}

/// Canonical status to downstream delivery status
fn delivery_status_for(status: MessageStatus) -> &'static str {
    match status {
        MessageStatus::Sent => "delivered",
        MessageStatus::Failed => "undelivered",
        MessageStatus::Queued => "queued",
        MessageStatus::Unknown => "unknown",
    }
}

/// Pull-based delivery reconciliation for providers without webhooks
pub struct StatusPoller {
    messages: MessageRepository,
    providers: ProviderRepository,
    registry: Arc<AdapterRegistry>,
    interval_secs: u64,
    batch_size: i64,
}

impl StatusPoller {
    /// Create a new status poller
    pub fn new(
        messages: MessageRepository,
        providers: ProviderRepository,
        registry: Arc<AdapterRegistry>,
        interval_secs: u64,
        batch_size: i64,
    ) -> Self {
        Self {
            messages,
            providers,
            registry,
            interval_secs,
            batch_size,
        }
    }

    /// Run the polling loop
    pub async fn run(&self) {
        let mut ticker = interval(TokioDuration::from_secs(self.interval_secs));

        info!("Status poller started");

        loop {
            ticker.tick().await;

            if let Err(e) = self.poll_cycle().await {
                error!("Error polling delivery statuses: {}", e);
            }
        }
    }

    /// One polling cycle; per-message failures are isolated
    async fn poll_cycle(&self) -> Result<()> {
        let pending = self.messages.list_awaiting_delivery(self.batch_size).await?;

        if pending.is_empty() {
            return Ok(());
        }

        debug!(count = pending.len(), "refreshing delivery statuses");

        for message in pending {
            if let Err(e) = self.refresh_message(&message).await {
                warn!(message_id = %message.id, "status refresh failed: {}", e);
            }
        }

        Ok(())
    }

    async fn refresh_message(
        &self,
        message: &courier_storage::models::OutboundMessage,
    ) -> Result<()> {
        let (Some(provider_id), Some(provider_message_id)) =
            (message.provider_id, message.provider_message_id.as_deref())
        else {
            return Ok(());
        };

        let Some(provider) = self.providers.get(provider_id).await? else {
            warn!(%provider_id, "message references unknown provider");
            return Ok(());
        };

        let config: ProviderConfig = serde_json::from_value(provider.config)?;
        let adapter = self.registry.get(&provider.adapter)?;

        let outcome = match adapter.get_status(provider_message_id, &config).await {
            Ok(outcome) => outcome,
            // Not every integration style exposes a status pull
            Err(AdapterError::Unsupported(_)) | Err(AdapterError::MissingEndpoint(_)) => {
                return Ok(())
            }
            Err(e) => return Err(e.into()),
        };

        self.messages
            .update_delivery_by_provider_message_id(
                provider_message_id,
                &outcome.status.to_string(),
                &outcome.delivery_status,
                outcome.delivery_details.as_deref(),
                &outcome.provider_raw_response,
            )
            .await?;

        debug!(
            message_id = %message.id,
            status = %outcome.status,
            "delivery status refreshed"
        );
        Ok(())
    }
}
