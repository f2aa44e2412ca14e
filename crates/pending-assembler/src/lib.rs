//! Drives a `(address, chainId, metadataHash)` assembly: fetches the
//! metadata itself, then fans out one task per declared source, validating
//! each against the keccak256 the metadata promised, into a
//! [`verifier_types::CheckedContract`].

mod error;

use content_hash::ContentHash;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use storage_fetcher::StorageFetcherRegistry;
use verifier_types::{
    keccak256, Address, ChainId, CheckedContract, InvalidSource, Metadata, MissingReason,
    PendingContract, SourceEntry,
};

pub use error::AssembleError;

enum SourceOutcome {
    Resolved(String, String),
    Missing(String, MissingReason),
    Invalid(String, InvalidSource),
}

/// Resolves one declared source that already carries inline `content`:
/// its only possible outcomes are a validated match or a hash mismatch.
fn resolve_inline(path: String, entry: &SourceEntry, content: String) -> SourceOutcome {
    let actual = keccak256(content.as_bytes());
    if actual == entry.keccak256 {
        SourceOutcome::Resolved(path, content)
    } else {
        SourceOutcome::Invalid(
            path,
            InvalidSource {
                expected: entry.keccak256,
                got: actual,
            },
        )
    }
}

/// Resolves one declared source with no inline content by trying its
/// declared `urls` in order, stopping at the first one that both fetches
/// and validates.
async fn resolve_by_urls(
    registry: &StorageFetcherRegistry,
    path: String,
    entry: &SourceEntry,
) -> SourceOutcome {
    for url in &entry.urls {
        let hash = match ContentHash::parse(url) {
            Ok(hash) => hash,
            Err(_) => continue,
        };
        let bytes = match registry.fetch(&hash).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %path, url = %url, error = %err, "source fetch attempt failed, trying next url");
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let actual = keccak256(content.as_bytes());
        if actual == entry.keccak256 {
            return SourceOutcome::Resolved(path, content);
        }
        tracing::warn!(path = %path, url = %url, "fetched source does not match declared keccak256, trying next url");
    }
    SourceOutcome::Missing(path, MissingReason::AllUrlsExhausted)
}

async fn resolve_source(
    registry: &StorageFetcherRegistry,
    path: String,
    entry: SourceEntry,
) -> SourceOutcome {
    match &entry.content {
        Some(content) => resolve_inline(path, &entry, content.clone()),
        None => resolve_by_urls(registry, path, &entry).await,
    }
}

/// `assemble(address, chainId, metadataHash) -> CheckedContract | error`.
///
/// Fails outright only if the metadata itself can't be resolved (`no-fetcher`
/// / a fetch error / unparseable JSON). Once metadata is in hand, assembly
/// always succeeds — individual sources that can't be resolved land in the
/// returned contract's `missing`/`invalid` maps instead of failing the call.
pub async fn assemble(
    registry: &StorageFetcherRegistry,
    metadata_hash: ContentHash,
    address: Address,
    chain_id: ChainId,
) -> Result<CheckedContract, AssembleError> {
    tracing::info!(chain_id = chain_id.0, address = %address, content_hash = %metadata_hash.to_uri(), "assembling contract from metadata hash");

    let metadata_bytes = registry
        .fetch(&metadata_hash)
        .await
        .map_err(error::from_metadata_fetch)?;
    let metadata: Metadata =
        serde_json::from_slice(&metadata_bytes).map_err(AssembleError::BadMetadata)?;

    let mut pending = PendingContract::new(metadata_hash, address, chain_id);
    pending.seed_from_metadata(metadata.clone());

    let mut tasks = FuturesUnordered::new();
    for (path, entry) in pending.pending_sources.clone() {
        tasks.push(resolve_source(registry, path, entry));
    }

    let mut sources = BTreeMap::new();
    let mut missing = BTreeMap::new();
    let mut invalid = BTreeMap::new();
    while let Some(outcome) = tasks.next().await {
        match outcome {
            SourceOutcome::Resolved(path, content) => {
                sources.insert(path, content);
            }
            SourceOutcome::Missing(path, reason) => {
                missing.insert(path, reason);
            }
            SourceOutcome::Invalid(path, invalid_source) => {
                invalid.insert(path, invalid_source);
            }
        }
    }

    let mut contract = CheckedContract::new(metadata);
    contract.merge_sources(sources, missing, invalid);
    Ok(contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use storage_fetcher::StorageOriginConfig;
    use url::Url;
    use verifier_types::CompilerInfo;

    fn source_entry(content: &str) -> SourceEntry {
        SourceEntry {
            keccak256: keccak256(content.as_bytes()),
            urls: vec![],
            content: Some(content.to_string()),
            license: None,
        }
    }

    fn metadata(sources: BTreeMap<String, SourceEntry>) -> Metadata {
        Metadata {
            language: "Solidity".to_string(),
            compiler: CompilerInfo {
                version: "0.8.17".to_string(),
            },
            sources,
            settings: serde_json::json!({"compilationTarget": {"A.sol": "A"}}),
            output: serde_json::Value::Null,
            version: 1,
        }
    }

    async fn registry_with_metadata_body(body: Vec<u8>) -> (wiremock::MockServer, StorageFetcherRegistry) {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;
        let registry = StorageFetcherRegistry::new(vec![StorageOriginConfig {
            origin: content_hash::ContentOrigin::Ipfs,
            gateway_urls: vec![Url::parse(&format!("{}/", server.uri())).unwrap()],
            attempt_timeout: Duration::from_secs(5),
            concurrency_limit: 8,
        }]);
        (server, registry)
    }

    fn ipfs_hash() -> ContentHash {
        ContentHash {
            origin: content_hash::ContentOrigin::Ipfs,
            hash: vec![7u8; 32],
        }
    }

    #[tokio::test]
    async fn no_fetcher_for_metadata_origin_fails_immediately() {
        let registry = StorageFetcherRegistry::new(vec![]);
        let err = assemble(&registry, ipfs_hash(), Address([0u8; 20]), ChainId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AssembleError::NoFetcher(content_hash::ContentOrigin::Ipfs)));
    }

    #[tokio::test]
    async fn unparseable_metadata_fails_bad_metadata() {
        let (_server, registry) = registry_with_metadata_body(b"not json".to_vec()).await;
        let err = assemble(&registry, ipfs_hash(), Address([0u8; 20]), ChainId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AssembleError::BadMetadata(_)));
    }

    #[tokio::test]
    async fn inline_content_validates_and_resolves() {
        let mut sources = BTreeMap::new();
        sources.insert("A.sol".to_string(), source_entry("contract A {}"));
        let metadata_bytes = serde_json::to_vec(&metadata(sources)).unwrap();

        let (_server, registry) = registry_with_metadata_body(metadata_bytes).await;
        let contract = assemble(&registry, ipfs_hash(), Address([0u8; 20]), ChainId(1))
            .await
            .unwrap();

        assert_eq!(contract.sources.get("A.sol").unwrap(), "contract A {}");
        assert!(contract.is_valid());
    }

    #[tokio::test]
    async fn inline_content_mismatch_is_recorded_invalid() {
        let mut bad_entry = source_entry("contract A {}");
        bad_entry.keccak256 = [0u8; 32];
        let mut sources = BTreeMap::new();
        sources.insert("A.sol".to_string(), bad_entry);
        let metadata_bytes = serde_json::to_vec(&metadata(sources)).unwrap();

        let (_server, registry) = registry_with_metadata_body(metadata_bytes).await;
        let contract = assemble(&registry, ipfs_hash(), Address([0u8; 20]), ChainId(1))
            .await
            .unwrap();

        assert!(!contract.is_valid());
        assert!(contract.invalid.contains_key("A.sol"));
    }

    #[tokio::test]
    async fn source_with_no_urls_and_no_content_is_missing() {
        let mut sources = BTreeMap::new();
        sources.insert(
            "A.sol".to_string(),
            SourceEntry {
                keccak256: [1u8; 32],
                urls: vec![],
                content: None,
                license: None,
            },
        );
        let metadata_bytes = serde_json::to_vec(&metadata(sources)).unwrap();

        let (_server, registry) = registry_with_metadata_body(metadata_bytes).await;
        let contract = assemble(&registry, ipfs_hash(), Address([0u8; 20]), ChainId(1))
            .await
            .unwrap();

        assert_eq!(
            contract.missing.get("A.sol"),
            Some(&MissingReason::AllUrlsExhausted)
        );
    }
}
