//! Courier - Dispatch server entry point

use anyhow::Result;
use courier_common::config::Config;
use courier_core::providers::{AdapterRegistry, ProviderSelector};
use courier_core::{
    BillingLedger, CampaignScheduler, DispatchCoordinator, DispatchQueue, DispatchWorker,
    StatusPoller,
};
use courier_storage::db::DatabasePool;
use courier_storage::repository::{
    CampaignRepository, ContactRepository, JobRepository, MessageRepository, ProviderRepository,
    TenantRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Courier dispatch server...");

    // Load configuration
    let config = Config::load()?;

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;

    // Run migrations
    db_pool.migrate().await?;

    let pool = db_pool.pool().clone();

    // Repositories
    let tenants = TenantRepository::new(pool.clone());
    let messages = MessageRepository::new(pool.clone());
    let providers = ProviderRepository::new(pool.clone());
    let campaigns = CampaignRepository::new(pool.clone());
    let contacts = ContactRepository::new(pool.clone());
    let jobs = JobRepository::new(pool.clone());

    // Shared outbound HTTP client and adapter registry
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()?;
    let registry = Arc::new(AdapterRegistry::with_defaults(http_client));

    // Engine services
    let ledger = BillingLedger::new(db_pool.clone());
    let selector = ProviderSelector::new(providers.clone());
    let coordinator = Arc::new(DispatchCoordinator::new(
        Arc::new(tenants.clone()),
        Arc::new(messages.clone()),
        Arc::new(selector),
        registry.clone(),
        Arc::new(ledger),
    ));
    let queue = Arc::new(DispatchQueue::new(
        messages.clone(),
        jobs.clone(),
        config.worker.max_attempts,
    ));

    // Start dispatch worker
    let worker_handle = {
        let worker = DispatchWorker::new(
            jobs.clone(),
            messages.clone(),
            coordinator.clone(),
            config.worker.poll_interval_secs,
            config.worker.batch_size,
        );
        tokio::spawn(async move {
            worker.run().await;
        })
    };

    // Start campaign scheduler
    let scheduler_handle = {
        let scheduler = CampaignScheduler::new(
            campaigns.clone(),
            contacts.clone(),
            queue.clone(),
            config.scheduler.tick_secs,
        );
        tokio::spawn(async move {
            scheduler.run().await;
        })
    };

    // Start delivery status poller if enabled
    let poller_handle = if config.poller.enabled {
        let poller = StatusPoller::new(
            messages.clone(),
            providers.clone(),
            registry.clone(),
            config.poller.interval_secs,
            config.poller.batch_size,
        );
        Some(tokio::spawn(async move {
            poller.run().await;
        }))
    } else {
        info!("Status poller disabled");
        None
    };

    info!("Courier server started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Cleanup
    worker_handle.abort();
    scheduler_handle.abort();
    if let Some(handle) = poller_handle {
        handle.abort();
    }

    info!("Courier server shutdown complete");

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,courier=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}
