//! Capability to fetch bytes by [`content_hash::ContentHash`] from a
//! decentralized storage origin (IPFS, Swarm), with per-origin gateway
//! ordering, retry and bounded concurrency.

mod error;
mod fetcher;
mod registry;

pub use error::FetchError;
pub use fetcher::{GatewayFetcher, StorageFetcher, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_CONCURRENCY_LIMIT};
pub use registry::{StorageFetcherRegistry, StorageOriginConfig};
