//! Dispatch queue - turns batch requests into queued messages plus a
//! durable job row consumed by the workers

use anyhow::Result;
use courier_common::types::{CampaignId, MessageId, RequestContext};
use courier_storage::models::{Campaign, Contact, CreateOutboundMessage};
use courier_storage::repository::{JobRepository, MessageRepository};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Queue name for dispatch jobs
pub const DISPATCH_QUEUE: &str = "dispatch";

/// Inbound batch request, from the API collaborator or the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub channel: String,
    pub recipients: Vec<String>,
    pub content: String,
    /// Country calling code; the tenant default applies when absent
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<CampaignId>,
}

/// Durable job payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchJobPayload {
    pub tenant_id: courier_common::types::TenantId,
    pub channel: String,
    pub message_ids: Vec<MessageId>,
}

/// Enqueues batches for asynchronous dispatch
#[derive(Clone)]
pub struct DispatchQueue {
    messages: MessageRepository,
    jobs: JobRepository,
    max_attempts: i32,
}

impl DispatchQueue {
    /// Create a new dispatch queue
    pub fn new(messages: MessageRepository, jobs: JobRepository, max_attempts: i32) -> Self {
        Self {
            messages,
            jobs,
            max_attempts,
        }
    }

    /// Enqueue a direct batch request: one queued message per recipient,
    /// then one job covering the whole batch.
    pub async fn enqueue(
        &self,
        ctx: &RequestContext,
        request: BatchRequest,
    ) -> Result<Vec<MessageId>> {
        info!(
            tenant_id = %ctx.tenant_id,
            recipients = request.recipients.len(),
            channel = %request.channel,
            "enqueuing batch"
        );

        let mut message_ids = Vec::with_capacity(request.recipients.len());
        for recipient in &request.recipients {
            let message = self
                .messages
                .create_queued(CreateOutboundMessage {
                    tenant_id: ctx.tenant_id,
                    campaign_id: request.campaign_id,
                    recipient: recipient.clone(),
                    country_code: request.country_code.clone(),
                    content: request.content.clone(),
                    content_type: "plain_text".to_string(),
                })
                .await?;
            message_ids.push(message.id);
        }

        self.enqueue_job(ctx, &request.channel, &message_ids).await?;

        info!(
            tenant_id = %ctx.tenant_id,
            count = message_ids.len(),
            "batch enqueued"
        );
        Ok(message_ids)
    }

    /// Enqueue one campaign occurrence for its eligible contacts, keeping
    /// each contact's own country code.
    pub async fn enqueue_campaign(
        &self,
        ctx: &RequestContext,
        campaign: &Campaign,
        contacts: &[&Contact],
    ) -> Result<Vec<MessageId>> {
        let mut message_ids = Vec::with_capacity(contacts.len());
        for contact in contacts {
            let message = self
                .messages
                .create_queued(CreateOutboundMessage {
                    tenant_id: campaign.tenant_id,
                    campaign_id: Some(campaign.id),
                    recipient: contact.phone.clone(),
                    country_code: contact.country_code.clone(),
                    content: campaign.content.clone(),
                    content_type: campaign.content_type.clone(),
                })
                .await?;
            message_ids.push(message.id);
        }

        self.enqueue_job(ctx, &campaign.channel, &message_ids).await?;

        info!(
            campaign_id = %campaign.id,
            count = message_ids.len(),
            "campaign batch enqueued"
        );
        Ok(message_ids)
    }

    async fn enqueue_job(
        &self,
        ctx: &RequestContext,
        channel: &str,
        message_ids: &[MessageId],
    ) -> Result<()> {
        let payload = DispatchJobPayload {
            tenant_id: ctx.tenant_id,
            channel: channel.to_string(),
            message_ids: message_ids.to_vec(),
        };

        let job_id = self
            .jobs
            .enqueue(
                DISPATCH_QUEUE,
                serde_json::to_value(&payload)?,
                self.max_attempts,
            )
            .await?;

        info!(%job_id, "dispatch job enqueued");
        Ok(())
    }
}
