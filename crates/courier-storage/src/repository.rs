//! Repository layer for data access

pub mod billing;
pub mod campaigns;
pub mod contacts;
pub mod jobs;
pub mod messages;
pub mod providers;
pub mod tenants;

pub use billing::BillingRepository;
pub use campaigns::CampaignRepository;
pub use contacts::ContactRepository;
pub use jobs::JobRepository;
pub use messages::MessageRepository;
pub use providers::ProviderRepository;
pub use tenants::TenantRepository;
