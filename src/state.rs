use crate::config::{Config, StoreBackend};
use crate::memory::InMemoryStore;
use crate::service::ConfigService;
use crate::spanner::SpannerClient;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: ConfigService,
    pub config: Arc<Config>,
}

impl AppState {
    /// Connect the configured backend and wire it into a [`ConfigService`]
    pub async fn from_config(config: Config) -> Result<Self> {
        let service = match config.backend {
            StoreBackend::Spanner => {
                let spanner_config = config
                    .spanner
                    .as_ref()
                    .context("Spanner backend selected without Spanner configuration")?;
                let client = SpannerClient::from_config(spanner_config).await?;
                ConfigService::new(
                    Arc::new(client.clone()),
                    Arc::new(client),
                    config.blob_threshold_bytes,
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on shutdown");
                let store = InMemoryStore::new();
                ConfigService::new(
                    Arc::new(store.clone()),
                    Arc::new(store),
                    config.blob_threshold_bytes,
                )
            }
        };

        Ok(Self {
            service,
            config: Arc::new(config),
        })
    }
}
