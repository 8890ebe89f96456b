//! Channel provider selection
//!
//! Resolves the failover chain for a channel: providers ordered ascending
//! by configured priority, ties broken by insertion order. An empty chain
//! is a configuration error surfaced before any ledger mutation.

use courier_common::types::ProviderId;
use courier_storage::repository::ProviderRepository;
use thiserror::Error;

use super::config::ProviderConfig;

/// Selection failure
#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("no provider configured for channel \"{channel}\"")]
    NoProviderConfigured { channel: String },

    #[error("provider \"{name}\" has invalid configuration: {reason}")]
    InvalidConfig { name: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A provider resolved for dispatch, config already deserialized
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    pub id: ProviderId,
    pub name: String,
    pub adapter: String,
    pub config: ProviderConfig,
}

/// Priority-ordered provider resolution for a channel
#[derive(Clone)]
pub struct ProviderSelector {
    providers: ProviderRepository,
}

impl ProviderSelector {
    /// Create a new selector
    pub fn new(providers: ProviderRepository) -> Self {
        Self { providers }
    }

    /// Resolve the ordered failover chain for a channel
    pub async fn resolve(&self, channel: &str) -> Result<Vec<ResolvedProvider>, SelectorError> {
        let rows = self.providers.list_for_channel(channel).await?;

        if rows.is_empty() {
            return Err(SelectorError::NoProviderConfigured {
                channel: channel.to_string(),
            });
        }

        let mut resolved = Vec::with_capacity(rows.len());
        for row in rows {
            let config: ProviderConfig =
                serde_json::from_value(row.config).map_err(|e| SelectorError::InvalidConfig {
                    name: row.name.clone(),
                    reason: e.to_string(),
                })?;

            resolved.push(ResolvedProvider {
                id: row.id,
                name: row.name,
                adapter: row.adapter,
                config,
            });
        }

        Ok(resolved)
    }
}
