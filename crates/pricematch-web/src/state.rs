use std::sync::Arc;

use pricematch_core::{
    CatalogCache, FieldServiceApi, Matcher, Poller, ProcessedForms, ServiceTitanClient,
    ServiceTitanConfig,
};

use crate::config::ServerConfig;

/// Shared handler state. The poller owns the API client, catalog cache and
/// processed-forms store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub poller: Arc<Poller<dyn FieldServiceApi>>,
}

impl AppState {
    pub fn new(config: ServerConfig, poller: Poller<dyn FieldServiceApi>) -> Self {
        Self {
            config: Arc::new(config),
            poller: Arc::new(poller),
        }
    }

    /// Wire up the ServiceTitan client from the environment.
    pub async fn connect(config: ServerConfig) -> anyhow::Result<Self> {
        let servicetitan = ServiceTitanConfig::from_env()?;
        let matcher = Matcher::new(config.match_config())?;
        let cache = CatalogCache::new(servicetitan.catalog_ttl());
        let processed = ProcessedForms::load(servicetitan.processed_forms_path()).await?;
        tracing::info!("Loaded {} processed forms", processed.len().await);

        let client = ServiceTitanClient::new(servicetitan)?;
        client.tokens().load_cached().await;

        let api: Arc<dyn FieldServiceApi> = Arc::new(client);
        Ok(Self::new(config, Poller::new(api, matcher, cache, processed)))
    }
}
