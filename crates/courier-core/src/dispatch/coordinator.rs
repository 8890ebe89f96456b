//! Dispatch coordinator - the per-batch state machine
//!
//! Received -> Metered -> Attempting(provider_i) -> Sent | Attempting(next)
//! -> Terminal. Providers are resolved before metering so misconfiguration
//! never touches the ledger; metering commits before the first provider
//! request; partial success persists and stays.

use courier_common::types::{MessageId, MessageStatus, RequestContext, TenantId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::stores::{ChannelResolver, MessageStore, Metering, TenantStore};
use crate::billing::LedgerError;
use crate::providers::{
    AdapterRegistry, BatchOutcome, DispatchInput, MessageOutcome, ResolvedProvider, SelectorError,
};
use crate::telemetry;

/// Terminal dispatch failure
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("tenant {0} not found")]
    TenantNotFound(TenantId),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("all providers failed for messages {message_ids:?}")]
    AllProvidersFailed { message_ids: Vec<MessageId> },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl DispatchError {
    /// Permanent errors are not worth retrying at the job level
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            DispatchError::TenantNotFound(_)
                | DispatchError::Selector(SelectorError::NoProviderConfigured { .. })
                | DispatchError::Selector(SelectorError::InvalidConfig { .. })
                | DispatchError::Ledger(LedgerError::InsufficientBalance { .. })
                | DispatchError::Ledger(LedgerError::NoActiveSubscription)
                | DispatchError::Ledger(LedgerError::InvalidPrice)
        )
    }
}

/// What a dispatch invocation accomplished
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub sent: Vec<MessageOutcome>,
}

/// Orchestrates metering and the provider failover chain for one batch
pub struct DispatchCoordinator {
    tenants: Arc<dyn TenantStore>,
    messages: Arc<dyn MessageStore>,
    selector: Arc<dyn ChannelResolver>,
    registry: Arc<AdapterRegistry>,
    ledger: Arc<dyn Metering>,
}

impl DispatchCoordinator {
    /// Create a new dispatch coordinator
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        messages: Arc<dyn MessageStore>,
        selector: Arc<dyn ChannelResolver>,
        registry: Arc<AdapterRegistry>,
        ledger: Arc<dyn Metering>,
    ) -> Self {
        Self {
            tenants,
            messages,
            selector,
            registry,
            ledger,
        }
    }

    /// Dispatch one batch. The batch is owned exclusively by this
    /// invocation; messages already sent in earlier failover iterations
    /// stay sent even when the chain is eventually exhausted.
    pub async fn dispatch_batch(
        &self,
        ctx: &RequestContext,
        mut inputs: Vec<DispatchInput>,
    ) -> Result<DispatchReport, DispatchError> {
        if inputs.is_empty() {
            return Ok(DispatchReport::default());
        }

        let tenant = self
            .tenants
            .get_tenant(ctx.tenant_id)
            .await?
            .ok_or(DispatchError::TenantNotFound(ctx.tenant_id))?;

        for input in &mut inputs {
            if input.country_code.is_empty() {
                warn!(
                    message_id = %input.id,
                    "message has no country, using tenant default {}",
                    tenant.country_code
                );
                input.country_code = tenant.country_code.clone();
            }
        }

        // Resolve the failover chain first: a misconfigured channel must
        // surface before any ledger mutation
        let channel = inputs[0].channel.clone();
        let providers = self.selector.resolve(&channel).await?;

        let message_ids: Vec<MessageId> = inputs.iter().map(|i| i.id).collect();
        self.ledger.meter(ctx, &message_ids).await.map_err(|e| {
            if matches!(e, LedgerError::InsufficientBalance { .. }) {
                telemetry::metrics().balance_rejections.inc();
            }
            e
        })?;
        telemetry::metrics().batches_dispatched.inc();

        info!(
            tenant_id = %ctx.tenant_id,
            count = inputs.len(),
            %channel,
            "processing batch"
        );

        let mut report = DispatchReport::default();
        let mut remaining = inputs;

        for provider in &providers {
            if remaining.is_empty() {
                break;
            }

            match self.attempt_provider(provider, &remaining).await {
                Ok(outcome) => {
                    for sent in outcome.sent {
                        self.persist_sent(provider, &sent).await?;
                        report.sent.push(sent);
                    }
                    if !outcome.failed.is_empty() {
                        warn!(
                            provider = %provider.name,
                            count = outcome.failed.len(),
                            "retrying failed messages with the next provider"
                        );
                        telemetry::metrics().provider_failovers.inc();
                    }
                    remaining = outcome.failed;
                }
                Err(e) => {
                    // The whole invocation failed; every remaining message
                    // moves on to the next provider
                    warn!(provider = %provider.name, error = %e, "provider invocation failed");
                    telemetry::metrics().provider_failovers.inc();
                }
            }
        }

        if !remaining.is_empty() {
            let failed_ids: Vec<MessageId> = remaining.iter().map(|i| i.id).collect();
            error!(
                tenant_id = %ctx.tenant_id,
                count = failed_ids.len(),
                "all providers failed for the remaining messages"
            );

            self.messages
                .record_failed(&failed_ids, "all providers failed")
                .await?;
            telemetry::metrics()
                .messages_failed
                .inc_by(failed_ids.len() as u64);

            return Err(DispatchError::AllProvidersFailed {
                message_ids: failed_ids,
            });
        }

        Ok(report)
    }

    /// One provider attempt over the remaining inputs
    async fn attempt_provider(
        &self,
        provider: &ResolvedProvider,
        remaining: &[DispatchInput],
    ) -> Result<BatchOutcome, anyhow::Error> {
        let adapter = self.registry.get(&provider.adapter)?;

        if remaining.len() == 1 {
            let input = &remaining[0];
            let outcome = adapter.send_single(input, &provider.config).await?;
            if outcome.status == MessageStatus::Failed {
                return Ok(BatchOutcome {
                    sent: Vec::new(),
                    failed: vec![input.clone()],
                });
            }
            return Ok(BatchOutcome {
                sent: vec![outcome],
                failed: Vec::new(),
            });
        }

        Ok(adapter.send_batch(remaining, &provider.config).await?)
    }

    /// Persist a sent outcome, atomically per message
    async fn persist_sent(
        &self,
        provider: &ResolvedProvider,
        outcome: &MessageOutcome,
    ) -> Result<(), DispatchError> {
        let Some(message_id) = outcome.id else {
            warn!(provider = %provider.name, "sent outcome without a message id, skipping persist");
            return Ok(());
        };

        self.messages
            .record_sent(message_id, provider.id, outcome)
            .await?;

        telemetry::metrics().messages_sent.inc();
        info!(
            %message_id,
            provider = %provider.name,
            "message sent"
        );
        Ok(())
    }
}
