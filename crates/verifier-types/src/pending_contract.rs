use crate::chain::{Address, ChainId};
use crate::metadata::{Metadata, SourceEntry};
use content_hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A metadata-hash-driven assembly in progress.
///
/// Invariant: every declared source path appears in exactly one of
/// `pending_sources` / `fetched_sources`. An entry moves pending → fetched
/// once its content is set and its keccak validates; see
/// [`PendingContract::mark_fetched`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingContract {
    pub metadata_hash: ContentHash,
    pub address: Address,
    pub chain_id: ChainId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub pending_sources: BTreeMap<String, SourceEntry>,
    pub fetched_sources: BTreeMap<String, SourceEntry>,
}

impl PendingContract {
    pub fn new(metadata_hash: ContentHash, address: Address, chain_id: ChainId) -> Self {
        Self {
            metadata_hash,
            address,
            chain_id,
            metadata: None,
            pending_sources: BTreeMap::new(),
            fetched_sources: BTreeMap::new(),
        }
    }

    /// Seeds `pending_sources` as a deep copy of the metadata's source map,
    /// the starting point for assembly fan-out.
    pub fn seed_from_metadata(&mut self, metadata: Metadata) {
        self.pending_sources = metadata.sources.clone();
        self.fetched_sources.clear();
        self.metadata = Some(metadata);
    }

    pub fn mark_fetched(&mut self, path: &str, entry: SourceEntry) {
        self.pending_sources.remove(path);
        self.fetched_sources.insert(path.to_string(), entry);
    }

    pub fn is_complete(&self) -> bool {
        self.pending_sources.is_empty()
    }
}
