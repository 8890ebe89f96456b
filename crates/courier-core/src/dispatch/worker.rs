//! Dispatch worker - drains the durable job queue
//!
//! Jobs are claimed with FOR UPDATE SKIP LOCKED, so any number of workers
//! can run concurrently; a batch is processed at least once. Messages
//! already sent by an earlier attempt are filtered out on retry, keeping
//! the ledger at-most-once per message.

use anyhow::Result;
use chrono::{Duration, Utc};
use courier_common::types::RequestContext;
use courier_storage::models::DispatchJob;
use courier_storage::repository::{JobRepository, MessageRepository};
use std::sync::Arc;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{debug, error, info, warn};

use super::coordinator::DispatchCoordinator;
use super::queue::{DispatchJobPayload, DISPATCH_QUEUE};
use crate::providers::DispatchInput;

/// Queue-driven dispatch worker
pub struct DispatchWorker {
    jobs: JobRepository,
    messages: MessageRepository,
    coordinator: Arc<DispatchCoordinator>,
    poll_interval_secs: u64,
    batch_size: i64,
}

impl DispatchWorker {
    /// Create a new dispatch worker
    pub fn new(
        jobs: JobRepository,
        messages: MessageRepository,
        coordinator: Arc<DispatchCoordinator>,
        poll_interval_secs: u64,
        batch_size: i64,
    ) -> Self {
        Self {
            jobs,
            messages,
            coordinator,
            poll_interval_secs,
            batch_size,
        }
    }

    /// Run the worker loop
    pub async fn run(&self) {
        let mut ticker = interval(TokioDuration::from_secs(self.poll_interval_secs));

        info!("Dispatch worker started");

        loop {
            ticker.tick().await;

            if let Err(e) = self.process_due_jobs().await {
                error!("Error processing dispatch queue: {}", e);
            }
        }
    }

    /// Claim and process due jobs
    async fn process_due_jobs(&self) -> Result<()> {
        let jobs = self.jobs.fetch_due(DISPATCH_QUEUE, self.batch_size).await?;

        for job in jobs {
            self.process_job(job).await;
        }

        Ok(())
    }

    /// Process a single job; failures never propagate past this job
    async fn process_job(&self, job: DispatchJob) {
        let job_id = job.id;
        debug!(%job_id, "processing dispatch job");

        if let Err(e) = self.jobs.mark_started(job_id).await {
            error!(%job_id, "failed to mark job started: {}", e);
            return;
        }

        let payload: DispatchJobPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(p) => p,
            Err(e) => {
                error!(%job_id, "failed to parse job payload: {}", e);
                let _ = self.jobs.mark_failed(job_id, &e.to_string()).await;
                return;
            }
        };

        match self.dispatch_payload(&payload).await {
            Ok(()) => {
                info!(%job_id, "dispatch job completed");
                if let Err(e) = self.jobs.mark_completed(job_id).await {
                    error!(%job_id, "failed to mark job completed: {}", e);
                }
            }
            Err(e) => {
                warn!(%job_id, "dispatch job failed: {}", e);

                let permanent = e
                    .downcast_ref::<super::coordinator::DispatchError>()
                    .map(|de| de.is_permanent())
                    .unwrap_or(false);

                let attempts = job.attempts + 1;
                if permanent || attempts >= job.max_attempts {
                    error!(%job_id, "job will not be retried, marking failed");
                    let _ = self.jobs.mark_failed(job_id, &e.to_string()).await;
                } else {
                    let delay = calculate_backoff(attempts);
                    let _ = self
                        .jobs
                        .schedule_retry(job_id, attempts, &e.to_string(), Utc::now() + delay)
                        .await;
                    info!(%job_id, attempt = attempts, "job scheduled for retry");
                }
            }
        }
    }

    /// Reload the batch and dispatch the messages still queued
    async fn dispatch_payload(&self, payload: &DispatchJobPayload) -> Result<()> {
        let records = self
            .messages
            .get_batch(payload.tenant_id, &payload.message_ids)
            .await?;

        // At-least-once: a retried job skips messages a previous attempt
        // already resolved
        let inputs: Vec<DispatchInput> = records
            .into_iter()
            .filter(|m| m.status == "queued")
            .map(|m| DispatchInput {
                id: m.id,
                tenant_id: m.tenant_id,
                recipient: m.recipient,
                country_code: m.country_code.unwrap_or_default(),
                content: m.content,
                channel: payload.channel.clone(),
            })
            .collect();

        if inputs.is_empty() {
            debug!("no queued messages left in batch");
            return Ok(());
        }

        let ctx = RequestContext::new(payload.tenant_id);
        self.coordinator.dispatch_batch(&ctx, inputs).await?;
        Ok(())
    }
}

/// Exponential backoff delay
fn calculate_backoff(attempts: i32) -> Duration {
    // Base: 1 minute, max: 4 hours
    let minutes = std::cmp::min(2_i64.pow(attempts as u32), 240);
    Duration::minutes(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_backoff() {
        assert_eq!(calculate_backoff(0), Duration::minutes(1));
        assert_eq!(calculate_backoff(1), Duration::minutes(2));
        assert_eq!(calculate_backoff(2), Duration::minutes(4));
        assert_eq!(calculate_backoff(3), Duration::minutes(8));
        assert_eq!(calculate_backoff(10), Duration::minutes(240)); // Max capped at 4 hours
    }
}
