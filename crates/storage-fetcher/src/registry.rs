use crate::error::FetchError;
use crate::fetcher::{GatewayFetcher, StorageFetcher};
use content_hash::{ContentHash, ContentOrigin};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// One gateway-ordering configuration entry, as loaded from
/// `VerifierConfig`'s `storage` section.
pub struct StorageOriginConfig {
    pub origin: ContentOrigin,
    pub gateway_urls: Vec<Url>,
    pub attempt_timeout: Duration,
    pub concurrency_limit: usize,
}

/// `origin -> StorageFetcher`. Missing origin yields [`FetchError::NoFetcher`].
pub struct StorageFetcherRegistry {
    fetchers: HashMap<ContentOrigin, Box<dyn StorageFetcher>>,
}

impl StorageFetcherRegistry {
    pub fn new(configs: Vec<StorageOriginConfig>) -> Self {
        let fetchers = configs
            .into_iter()
            .map(|config| {
                let fetcher = GatewayFetcher::with_limits(
                    config.gateway_urls,
                    config.attempt_timeout,
                    config.concurrency_limit,
                );
                (config.origin, Box::new(fetcher) as Box<dyn StorageFetcher>)
            })
            .collect();
        Self { fetchers }
    }

    pub async fn fetch(&self, hash: &ContentHash) -> Result<bytes::Bytes, FetchError> {
        let fetcher = self
            .fetchers
            .get(&hash.origin)
            .ok_or(FetchError::NoFetcher(hash.origin))?;
        fetcher.fetch(hash).await
    }
}
