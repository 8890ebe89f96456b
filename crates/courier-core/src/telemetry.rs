//! Prometheus metrics for the dispatch engine

use prometheus::{IntCounter, Registry};
use std::sync::OnceLock;

/// Engine counters, registered on one shared registry
pub struct Metrics {
    registry: Registry,
    pub messages_sent: IntCounter,
    pub messages_failed: IntCounter,
    pub batches_dispatched: IntCounter,
    pub provider_failovers: IntCounter,
    pub balance_rejections: IntCounter,
    pub campaign_ticks: IntCounter,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let messages_sent = IntCounter::new(
            "courier_messages_sent_total",
            "Messages successfully handed to a provider",
        )
        .expect("valid counter");
        let messages_failed = IntCounter::new(
            "courier_messages_failed_total",
            "Messages failed after exhausting the provider chain",
        )
        .expect("valid counter");
        let batches_dispatched = IntCounter::new(
            "courier_batches_dispatched_total",
            "Batches metered and dispatched",
        )
        .expect("valid counter");
        let provider_failovers = IntCounter::new(
            "courier_provider_failovers_total",
            "Failovers to the next provider in the chain",
        )
        .expect("valid counter");
        let balance_rejections = IntCounter::new(
            "courier_balance_rejections_total",
            "Batches rejected for insufficient balance",
        )
        .expect("valid counter");
        let campaign_ticks = IntCounter::new(
            "courier_campaign_ticks_total",
            "Campaign scheduler ticks",
        )
        .expect("valid counter");

        for counter in [
            &messages_sent,
            &messages_failed,
            &batches_dispatched,
            &provider_failovers,
            &balance_rejections,
            &campaign_ticks,
        ] {
            registry
                .register(Box::new(counter.clone()))
                .expect("unique counter");
        }

        Self {
            registry,
            messages_sent,
            messages_failed,
            batches_dispatched,
            provider_failovers,
            balance_rejections,
            campaign_ticks,
        }
    }

    /// The registry holding all engine metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Process-wide engine metrics
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
