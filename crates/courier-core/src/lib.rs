//! Courier Core - Message dispatch and metering engine
//!
//! This crate provides the core dispatch functionality for Courier:
//! declarative payload mapping, provider adapters with ordered failover,
//! the prepaid billing ledger, queue-driven batch dispatch, and the
//! campaign scheduler.

pub mod billing;
pub mod campaigns;
pub mod dispatch;
pub mod mapping;
pub mod providers;
pub mod telemetry;

pub use billing::{BillingLedger, FundingPlan, LedgerError};
pub use campaigns::{CampaignScheduler, RecurrenceRule, RecurrenceSpec};
pub use dispatch::{
    BatchRequest, DeliveryService, DispatchCoordinator, DispatchError, DispatchQueue,
    DispatchReport, DispatchWorker, StatusPoller,
};
pub use mapping::{MappingError, MappingSpec, ResponseMapping};
pub use providers::{
    AdapterError, AdapterRegistry, BatchOutcome, DispatchInput, MessageOutcome, ProviderAdapter,
    ProviderConfig, ProviderSelector,
};
