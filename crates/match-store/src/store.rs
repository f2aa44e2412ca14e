use crate::error::StoreError;
use crate::paths::sanitize_source_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use verifier_types::{Address, ChainId, CheckedContract, Match, MatchQuality};

/// Root-level `manifest.json`: a single monotonically-non-decreasing
/// timestamp bumped on every successful [`MatchStore::store`], independent
/// of which `(chainId, address)` was written.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct Manifest {
    timestamp: i64,
}

/// Content-addressed filesystem repository of verified contracts, rooted at
/// `root/contracts/{full_match|partial_match}/{chainId}/{checksummedAddress}/`
/// with a root-level `manifest.json` tag.
pub struct MatchStore {
    root: PathBuf,
}

impl MatchStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn contract_dir(&self, quality: MatchQuality, chain_id: ChainId, address: Address) -> PathBuf {
        self.root
            .join("contracts")
            .join(quality.partition_dir())
            .join(chain_id.0.to_string())
            .join(address.checksummed())
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    /// Looks up previously stored matches for `(chain_id, address)`,
    /// `full_match` first, then `partial_match`. The two partitions are
    /// mutually exclusive on disk (see [`Self::store`]'s promotion step), so
    /// at most one entry is ever returned, but the return type mirrors
    /// lookup's directory-walk shape rather than collapsing to `Option`.
    pub async fn lookup(&self, chain_id: ChainId, address: Address) -> Result<Vec<Match>, StoreError> {
        for quality in [MatchQuality::Full, MatchQuality::Partial] {
            let dir = self.contract_dir(quality, chain_id, address);
            match fs::read(dir.join("match.json")).await {
                Ok(bytes) => {
                    let mut match_: Match = serde_json::from_slice(&bytes)?;
                    match_.storage_timestamp = directory_birth_millis(&dir).await;
                    return Ok(vec![match_]);
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(Vec::new())
    }

    /// Persists `contract`/`match_` under the partition `match_.quality()`
    /// selects. If the opposite partition already holds a directory for this
    /// `(chainId, address)` — i.e. this store call promotes a prior partial
    /// match to full, or (defensively) demotes a full one — that stale
    /// directory is removed after every artifact of the new one is written
    /// and only the manifest tag remains to be bumped, so a crash mid-write
    /// never leaves the pair with neither partition present.
    pub async fn store(&self, contract: &CheckedContract, match_: &Match) -> Result<(), StoreError> {
        let quality = match_.quality().ok_or(StoreError::NoMatch)?;
        let chain_id = match_.chain_id;
        let address = match_.address;

        let dir = self.contract_dir(quality, chain_id, address);
        let sources_dir = dir.join("sources");
        fs::create_dir_all(&sources_dir).await?;

        let metadata_json = serde_json::to_vec_pretty(&contract.metadata)?;
        fs::write(dir.join("metadata.json"), metadata_json).await?;

        let mut translations = BTreeMap::new();
        for (path, content) in &contract.sources {
            let (sanitized, changed) = sanitize_source_path(path);
            if changed {
                translations.insert(path.clone(), sanitized.clone());
            }
            let file_path = sources_dir.join(&sanitized);
            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(file_path, content.as_bytes()).await?;
        }
        if !translations.is_empty() {
            fs::write(
                dir.join("path-translation.json"),
                serde_json::to_vec_pretty(&translations)?,
            )
            .await?;
        }

        if let Some(constructor_args) = &match_.abi_encoded_constructor_arguments {
            fs::write(dir.join("constructor-args.txt"), hex::encode(constructor_args)).await?;
        }
        if let Some(creator_tx_hash) = &match_.creator_tx_hash {
            fs::write(dir.join("creator-tx-hash.txt"), creator_tx_hash).await?;
        }
        if !match_.library_map.is_empty() {
            fs::write(
                dir.join("library-map.json"),
                serde_json::to_vec_pretty(&match_.library_map)?,
            )
            .await?;
        }
        if !match_.immutable_references.is_empty() {
            let encoded: BTreeMap<String, String> = match_
                .immutable_references
                .iter()
                .map(|(k, v)| (k.clone(), hex::encode(v)))
                .collect();
            fs::write(
                dir.join("immutable-references.json"),
                serde_json::to_vec_pretty(&encoded)?,
            )
            .await?;
        }

        // storage_timestamp is derived from directory birthtime on lookup, not
        // stored in match.json itself.
        let mut to_write = match_.clone();
        to_write.storage_timestamp = None;
        fs::write(dir.join("match.json"), serde_json::to_vec_pretty(&to_write)?).await?;

        self.remove_stale_partition(quality, chain_id, address).await?;
        self.bump_manifest().await?;

        tracing::info!(
            chain_id = chain_id.0,
            address = %address,
            quality = quality.partition_dir(),
            "stored match"
        );
        Ok(())
    }

    /// Removes the directory belonging to the *other* partition for this
    /// `(chainId, address)`, if one exists, by renaming it aside first and
    /// then deleting the renamed copy — a reader mid-lookup sees either the
    /// old directory or nothing, never a half-deleted one.
    async fn remove_stale_partition(
        &self,
        quality: MatchQuality,
        chain_id: ChainId,
        address: Address,
    ) -> Result<(), StoreError> {
        let other = match quality {
            MatchQuality::Full => MatchQuality::Partial,
            MatchQuality::Partial => MatchQuality::Full,
        };
        let stale_dir = self.contract_dir(other, chain_id, address);
        if !path_exists(&stale_dir).await {
            return Ok(());
        }
        let aside = stale_dir.with_extension("stale");
        fs::rename(&stale_dir, &aside).await?;
        fs::remove_dir_all(&aside).await?;
        Ok(())
    }

    async fn bump_manifest(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;
        let manifest_path = self.manifest_path();
        let previous = match fs::read(&manifest_path).await {
            Ok(bytes) => serde_json::from_slice::<Manifest>(&bytes)?.timestamp,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => 0,
            Err(err) => return Err(err.into()),
        };
        let manifest = Manifest {
            timestamp: now_millis().max(previous),
        };
        fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?).await?;
        Ok(())
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_millis() as i64
}

async fn directory_birth_millis(dir: &Path) -> Option<i64> {
    let metadata = fs::metadata(dir).await.ok()?;
    let created = metadata.created().ok()?;
    let millis = created.duration_since(UNIX_EPOCH).ok()?.as_millis();
    Some(millis as i64)
}

async fn path_exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use verifier_types::{CompilerInfo, Metadata, MatchType};

    fn address() -> Address {
        Address([1u8; 20])
    }

    fn contract_with_source(path: &str, content: &str) -> CheckedContract {
        let mut contract = CheckedContract::new(Metadata {
            language: "Solidity".to_string(),
            compiler: CompilerInfo {
                version: "0.8.17".to_string(),
            },
            sources: BTreeMap::new(),
            settings: serde_json::json!({}),
            output: serde_json::Value::Null,
            version: 1,
        });
        contract.sources.insert(path.to_string(), content.to_string());
        contract
    }

    fn perfect_match(chain_id: ChainId) -> Match {
        Match {
            address: address(),
            chain_id,
            runtime_match: Some(MatchType::Perfect),
            creation_match: None,
            library_map: BTreeMap::new(),
            immutable_references: BTreeMap::new(),
            abi_encoded_constructor_arguments: None,
            creator_tx_hash: None,
            storage_timestamp: None,
            message: None,
        }
    }

    fn partial_match(chain_id: ChainId) -> Match {
        let mut m = perfect_match(chain_id);
        m.runtime_match = Some(MatchType::Partial);
        m
    }

    #[tokio::test]
    async fn store_then_lookup_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatchStore::new(dir.path());
        let chain_id = ChainId(1);
        let contract = contract_with_source("A.sol", "contract A {}");
        let match_ = perfect_match(chain_id);

        store.store(&contract, &match_).await.unwrap();
        let found = store.lookup(chain_id, address()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].runtime_match, Some(MatchType::Perfect));
        assert!(found[0].storage_timestamp.is_some());
    }

    #[tokio::test]
    async fn lookup_of_unknown_address_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatchStore::new(dir.path());
        let found = store.lookup(ChainId(1), address()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn storing_a_match_with_neither_half_set_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatchStore::new(dir.path());
        let contract = contract_with_source("A.sol", "contract A {}");
        let mut match_ = perfect_match(ChainId(1));
        match_.runtime_match = None;
        let err = store.store(&contract, &match_).await.unwrap_err();
        assert!(matches!(err, StoreError::NoMatch));
    }

    #[tokio::test]
    async fn promoting_partial_to_full_removes_the_stale_partial_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatchStore::new(dir.path());
        let chain_id = ChainId(1);
        let contract = contract_with_source("A.sol", "contract A {}");

        store.store(&contract, &partial_match(chain_id)).await.unwrap();
        let partial_dir = store.contract_dir(MatchQuality::Partial, chain_id, address());
        assert!(path_exists(&partial_dir).await);

        store.store(&contract, &perfect_match(chain_id)).await.unwrap();
        assert!(!path_exists(&partial_dir).await);

        let full_dir = store.contract_dir(MatchQuality::Full, chain_id, address());
        assert!(path_exists(&full_dir).await);

        let found = store.lookup(chain_id, address()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].runtime_match, Some(MatchType::Perfect));
    }

    #[tokio::test]
    async fn a_path_escaping_source_is_sanitized_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatchStore::new(dir.path());
        let chain_id = ChainId(1);
        let contract = contract_with_source("../../etc/passwd", "contract A {}");

        store.store(&contract, &perfect_match(chain_id)).await.unwrap();
        let contract_dir = store.contract_dir(MatchQuality::Full, chain_id, address());
        assert!(path_exists(&contract_dir.join("sources/etc/passwd")).await);
        assert!(path_exists(&contract_dir.join("path-translation.json")).await);
    }

    #[tokio::test]
    async fn manifest_timestamp_never_decreases_across_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatchStore::new(dir.path());
        let contract = contract_with_source("A.sol", "contract A {}");

        store.store(&contract, &perfect_match(ChainId(1))).await.unwrap();
        let manifest_bytes = fs::read(store.manifest_path()).await.unwrap();
        let first: Manifest = serde_json::from_slice(&manifest_bytes).unwrap();

        store.store(&contract, &perfect_match(ChainId(2))).await.unwrap();
        let manifest_bytes = fs::read(store.manifest_path()).await.unwrap();
        let second: Manifest = serde_json::from_slice(&manifest_bytes).unwrap();

        assert!(second.timestamp >= first.timestamp);
    }
}
