//! Batch dispatch: queue, coordinator, worker and delivery reconciliation

mod coordinator;
mod delivery;
mod queue;
mod stores;
mod worker;

pub use coordinator::{DispatchCoordinator, DispatchError, DispatchReport};
pub use delivery::{DeliveryService, StatusPoller};
pub use queue::{BatchRequest, DispatchJobPayload, DispatchQueue, DISPATCH_QUEUE};
pub use stores::{ChannelResolver, MessageStore, Metering, TenantStore};
pub use worker::DispatchWorker;
