//! Adapter registry
//!
//! Maps adapter names from provider configuration to instances. Selection
//! happens at runtime by name; unknown names are loud configuration errors.

use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

use super::adapter::{AdapterError, ProviderAdapter};
use super::form::FormAdapter;
use super::mapped::MappedAdapter;
use super::url_template::UrlTemplateAdapter;

/// Registry of provider adapters by name
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Registry with the built-in integration styles
    pub fn with_defaults(client: Client) -> Self {
        let mut registry = Self {
            adapters: HashMap::new(),
        };
        registry.register("mapped", Arc::new(MappedAdapter::new(client.clone())));
        registry.register(
            "url_template",
            Arc::new(UrlTemplateAdapter::new(client.clone())),
        );
        registry.register("form", Arc::new(FormAdapter::new(client)));
        registry
    }

    /// Register an adapter under a name
    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    /// Look up an adapter by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownAdapter(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_registered() {
        let registry = AdapterRegistry::with_defaults(Client::new());
        assert!(registry.get("mapped").is_ok());
        assert!(registry.get("url_template").is_ok());
        assert!(registry.get("form").is_ok());
    }

    #[test]
    fn test_unknown_adapter_is_loud() {
        let registry = AdapterRegistry::with_defaults(Client::new());
        let err = registry.get("carrier_pigeon").unwrap_err();
        assert!(matches!(err, AdapterError::UnknownAdapter(name) if name == "carrier_pigeon"));
    }
}
