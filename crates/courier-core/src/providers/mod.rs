//! Provider adapters, registry and channel selection
//!
//! Each third-party messaging integration style is one adapter behind the
//! uniform `ProviderAdapter` capability set. Adapters are looked up by name
//! in the registry; the selector resolves the priority-ordered failover
//! chain configured for a channel.

mod adapter;
mod config;
mod form;
mod http;
mod mapped;
mod registry;
mod selector;
mod url_template;

pub use adapter::{
    AdapterError, BatchOutcome, DispatchInput, MessageOutcome, ProviderAdapter,
};
pub use config::{EndpointSpec, ErrorCheck, ProviderConfig, OP_SEND_BATCH, OP_SEND_SINGLE, OP_STATUS};
pub use form::FormAdapter;
pub use mapped::MappedAdapter;
pub use registry::AdapterRegistry;
pub use selector::{ProviderSelector, ResolvedProvider, SelectorError};
pub use url_template::UrlTemplateAdapter;
