use content_hash::ContentOrigin;
use storage_fetcher::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("no fetcher registered for metadata origin {0}")]
    NoFetcher(ContentOrigin),
    #[error("failed to fetch metadata: {0}")]
    MetadataFetch(#[source] FetchError),
    #[error("metadata is not valid JSON: {0}")]
    BadMetadata(#[source] serde_json::Error),
}

/// The first fetch (the metadata itself) distinguishes a registry miss from
/// every other fetch failure; source fetches during fan-out don't need this
/// distinction, they just fall through to the next URL or `missing`.
pub(crate) fn from_metadata_fetch(err: FetchError) -> AssembleError {
    match err {
        FetchError::NoFetcher(origin) => AssembleError::NoFetcher(origin),
        other => AssembleError::MetadataFetch(other),
    }
}
