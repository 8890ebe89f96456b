//! Campaign scheduler
//!
//! Ticks on a fixed interval. A campaign is due when its recurrence rule
//! yields an occurrence inside the tick window; due campaigns evaluate
//! their rules over the tenant's contacts and hand the eligible set to the
//! dispatch queue as one batch. A failing campaign never aborts the tick.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use courier_common::types::{CustomFieldId, RequestContext};
use courier_storage::models::{Campaign, Contact};
use courier_storage::repository::{CampaignRepository, ContactRepository};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{error, info, warn};

use super::recurrence::RecurrenceRule;
use super::rules::contact_is_eligible;
use crate::dispatch::DispatchQueue;
use crate::telemetry;

/// Tick-driven campaign scheduler
pub struct CampaignScheduler {
    campaigns: CampaignRepository,
    contacts: ContactRepository,
    queue: Arc<DispatchQueue>,
    tick_secs: u64,
}

impl CampaignScheduler {
    /// Create a new campaign scheduler
    pub fn new(
        campaigns: CampaignRepository,
        contacts: ContactRepository,
        queue: Arc<DispatchQueue>,
        tick_secs: u64,
    ) -> Self {
        Self {
            campaigns,
            contacts,
            queue,
            tick_secs,
        }
    }

    /// Run the scheduler loop
    pub async fn run(&self) {
        let mut ticker = interval(TokioDuration::from_secs(self.tick_secs));

        info!(tick_secs = self.tick_secs, "Campaign scheduler started");

        loop {
            ticker.tick().await;

            if let Err(e) = self.tick(Utc::now()).await {
                error!("Error processing scheduled campaigns: {}", e);
            }
        }
    }

    /// One scheduler tick over all active campaigns
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        telemetry::metrics().campaign_ticks.inc();

        let campaigns = self.campaigns.list_active_at(now).await?;
        if campaigns.is_empty() {
            return Ok(());
        }

        for campaign in campaigns {
            // One broken campaign must not starve the others
            if let Err(e) = self.process_campaign(&campaign, now).await {
                error!(campaign_id = %campaign.id, "error processing campaign: {}", e);
            }
        }

        Ok(())
    }

    /// Evaluate one campaign: due check, rule filtering, enqueue
    async fn process_campaign(&self, campaign: &Campaign, now: DateTime<Utc>) -> Result<()> {
        let rule = RecurrenceRule::parse(&campaign.recurrence)?;

        let window_start = now - Duration::seconds(self.tick_secs as i64);
        if !rule.occurs_between(window_start, now) {
            return Ok(());
        }

        info!(campaign_id = %campaign.id, "campaign due, evaluating contacts");

        let contacts = self.contacts.list_by_tenant(campaign.tenant_id).await?;
        if contacts.is_empty() {
            warn!(
                tenant_id = %campaign.tenant_id,
                "no contacts found for campaign tenant"
            );
            return Ok(());
        }

        let rules = self.campaigns.rules_for(campaign.id).await?;
        let custom_values = self.load_custom_values(&contacts).await?;

        let no_values: HashMap<CustomFieldId, Value> = HashMap::new();
        let eligible: Vec<&Contact> = contacts
            .iter()
            .filter(|contact| {
                let values = custom_values.get(&contact.id).unwrap_or(&no_values);
                contact_is_eligible(values, &rules)
            })
            .collect();

        if eligible.is_empty() {
            warn!(campaign_id = %campaign.id, "no eligible contacts for campaign");
            return Ok(());
        }

        info!(
            campaign_id = %campaign.id,
            eligible = eligible.len(),
            "enqueuing campaign batch"
        );

        let ctx = RequestContext::new(campaign.tenant_id);
        self.queue.enqueue_campaign(&ctx, campaign, &eligible).await?;

        Ok(())
    }

    /// Custom field values grouped per contact
    async fn load_custom_values(
        &self,
        contacts: &[Contact],
    ) -> Result<HashMap<uuid::Uuid, HashMap<CustomFieldId, Value>>> {
        let ids: Vec<_> = contacts.iter().map(|c| c.id).collect();
        let rows = self.contacts.custom_values_for(&ids).await?;

        let mut grouped: HashMap<uuid::Uuid, HashMap<CustomFieldId, Value>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.contact_id)
                .or_default()
                .insert(row.custom_field_id, row.value);
        }
        Ok(grouped)
    }
}
