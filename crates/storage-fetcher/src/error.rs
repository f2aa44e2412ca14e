use content_hash::ContentOrigin;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no fetcher registered for origin {0}")]
    NoFetcher(ContentOrigin),
    #[error("gateway returned a client error: {status}")]
    FetchPermanent { status: reqwest::StatusCode },
    #[error("all gateways exhausted for this content hash")]
    FetchUnavailable,
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    ReqwestMiddleware(#[from] reqwest_middleware::Error),
}
