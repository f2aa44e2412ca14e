use crate::error::FetchError;
use async_trait::async_trait;
use content_hash::{ContentHash, ContentOrigin};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Default per-attempt HTTP timeout for a single gateway call.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of in-flight fetches a single origin's fetcher allows.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 8;

#[async_trait]
pub trait StorageFetcher: Send + Sync {
    async fn fetch(&self, hash: &ContentHash) -> Result<bytes::Bytes, FetchError>;
}

/// Builds the request path a gateway expects for a given content hash.
/// Conventions follow the common public ipfs.io / Swarm Bee gateway layouts.
fn gateway_path(hash: &ContentHash) -> String {
    match hash.origin {
        ContentOrigin::Ipfs => format!("ipfs/{}", hash.to_uri().trim_start_matches("ipfs://")),
        ContentOrigin::SwarmBzzr0 | ContentOrigin::SwarmBzzr1 => {
            format!("bzz-raw:/{}", hex::encode(&hash.hash))
        }
    }
}

/// One [`StorageFetcher`] implementation per origin: an ordered list of
/// gateway bases, tried in order on network error or 5xx; a 4xx from any
/// gateway fails immediately without trying the rest.
pub struct GatewayFetcher {
    gateways: Vec<Url>,
    client: ClientWithMiddleware,
    concurrency: Arc<Semaphore>,
}

impl GatewayFetcher {
    pub fn new(gateways: Vec<Url>) -> Self {
        Self::with_limits(gateways, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_CONCURRENCY_LIMIT)
    }

    pub fn with_limits(
        gateways: Vec<Url>,
        attempt_timeout: Duration,
        concurrency_limit: usize,
    ) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);
        let reqwest_client = reqwest::Client::builder()
            .timeout(attempt_timeout)
            .build()
            .expect("reqwest client configuration is always valid");
        let client = reqwest_middleware::ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        Self {
            gateways,
            client,
            concurrency: Arc::new(Semaphore::new(concurrency_limit)),
        }
    }
}

#[async_trait]
impl StorageFetcher for GatewayFetcher {
    async fn fetch(&self, hash: &ContentHash) -> Result<bytes::Bytes, FetchError> {
        let _permit = self
            .concurrency
            .acquire()
            .await
            .expect("semaphore is never closed");
        let path = gateway_path(hash);

        for base in &self.gateways {
            let url = base.join(&path).expect("gateway path is always valid");
            tracing::info!(url = %url, origin = %hash.origin, "fetching from storage gateway");
            let response = match self.client.get(url.clone()).send().await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(url = %url, error = %err, "gateway request failed, trying next");
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return response.bytes().await.map_err(FetchError::from);
            }
            if status.is_client_error() {
                return Err(FetchError::FetchPermanent { status });
            }
            tracing::warn!(url = %url, status = %status, "gateway returned server error, trying next");
        }

        Err(FetchError::FetchUnavailable)
    }
}
