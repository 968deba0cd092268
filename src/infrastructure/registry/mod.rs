//! Remote module registry listing

use std::sync::Arc;

use crate::domain::entities::RegistryEntry;
use crate::domain::traits::Fetcher;
use crate::infrastructure::config::RegistryConfig;

/// Reads the registry repository's directory listing. Nothing is cached.
pub struct RegistryClient {
    fetcher: Arc<dyn Fetcher>,
    config: RegistryConfig,
}

impl RegistryClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: RegistryConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch and parse the listing; the error is a human-readable cause
    pub async fn listing(&self) -> Result<Vec<RegistryEntry>, String> {
        let url = self.config.listing_url();
        let body = self.fetcher
            .fetch(&url)
            .await
            .map_err(|e| format!("{} ({})", e, url))?;

        parse_listing(&body)
    }
}

/// Parse the JSON array returned by the contents endpoint
pub fn parse_listing(body: &[u8]) -> Result<Vec<RegistryEntry>, String> {
    serde_json::from_slice(body).map_err(|e| format!("Invalid listing: {}", e))
}
