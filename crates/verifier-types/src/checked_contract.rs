use crate::hex_serde;
use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a declared source path could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingReason {
    NotFoundInUpload,
    NoFetcherForOrigin,
    FetchUnavailable,
    FetchPermanent,
    AllUrlsExhausted,
}

/// A source whose bytes were found but whose hash does not match what the
/// metadata declared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidSource {
    #[serde(with = "hex_serde::array32")]
    pub expected: [u8; 32],
    #[serde(with = "hex_serde::array32")]
    pub got: [u8; 32],
}

/// Artifacts produced by compiling a [`CheckedContract`], before it is
/// compared against on-chain bytecode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledArtifacts {
    #[serde(with = "hex_serde::vec")]
    pub runtime_bytecode: Vec<u8>,
    #[serde(with = "hex_serde::vec")]
    pub creation_bytecode: Vec<u8>,
    /// Keyed by AST id, same shape the compiler emits under
    /// `evm.deployedBytecode.immutableReferences`.
    pub immutable_references: BTreeMap<String, Vec<ByteRange>>,
    pub link_references: BTreeMap<String, Vec<ByteRange>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: usize,
    pub length: usize,
}

/// A contract built from a [`Metadata`] plus whatever of its declared
/// sources could be resolved, either from an upload or an assembled fetch.
///
/// Invariant: every path in `metadata.sources` appears in exactly one of
/// `sources`, `missing`, `invalid`. A contract is valid for compilation iff
/// `missing` and `invalid` are both empty — see [`CheckedContract::is_valid`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckedContract {
    pub metadata: Metadata,
    pub sources: BTreeMap<String, String>,
    pub missing: BTreeMap<String, MissingReason>,
    pub invalid: BTreeMap<String, InvalidSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiled_artifacts: Option<CompiledArtifacts>,
}

impl CheckedContract {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            sources: BTreeMap::new(),
            missing: BTreeMap::new(),
            invalid: BTreeMap::new(),
            compiled_artifacts: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    /// Merges another partial resolution of the same declared sources into
    /// this one: existing validated sources are never overwritten, and a
    /// path already resolved here is removed from the incoming `missing`
    /// bookkeeping.
    pub fn merge_sources(
        &mut self,
        sources: BTreeMap<String, String>,
        missing: BTreeMap<String, MissingReason>,
        invalid: BTreeMap<String, InvalidSource>,
    ) {
        for (path, content) in sources {
            self.sources.entry(path.clone()).or_insert(content);
            self.missing.remove(&path);
            self.invalid.remove(&path);
        }
        for (path, reason) in missing {
            if !self.sources.contains_key(&path) {
                self.missing.insert(path, reason);
            }
        }
        for (path, invalid_source) in invalid {
            if !self.sources.contains_key(&path) {
                self.invalid.insert(path, invalid_source);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::CompilerInfo;
    use pretty_assertions::assert_eq;

    fn empty_metadata() -> Metadata {
        Metadata {
            language: "Solidity".to_string(),
            compiler: CompilerInfo {
                version: "0.8.17".to_string(),
            },
            sources: BTreeMap::new(),
            settings: serde_json::json!({}),
            output: serde_json::Value::Null,
            version: 1,
        }
    }

    #[test]
    fn valid_iff_no_missing_or_invalid() {
        let mut contract = CheckedContract::new(empty_metadata());
        assert!(contract.is_valid());
        contract
            .missing
            .insert("a.sol".to_string(), MissingReason::NotFoundInUpload);
        assert!(!contract.is_valid());
    }

    #[test]
    fn merge_never_overwrites_validated_source() {
        let mut contract = CheckedContract::new(empty_metadata());
        let mut first = BTreeMap::new();
        first.insert("a.sol".to_string(), "original".to_string());
        contract.merge_sources(first, BTreeMap::new(), BTreeMap::new());

        let mut second = BTreeMap::new();
        second.insert("a.sol".to_string(), "different".to_string());
        contract.merge_sources(second, BTreeMap::new(), BTreeMap::new());

        assert_eq!(contract.sources.get("a.sol").unwrap(), "original");
    }

    #[test]
    fn merge_fills_missing_and_clears_it_once_resolved() {
        let mut contract = CheckedContract::new(empty_metadata());
        let mut missing = BTreeMap::new();
        missing.insert("a.sol".to_string(), MissingReason::NotFoundInUpload);
        contract.merge_sources(BTreeMap::new(), missing, BTreeMap::new());
        assert!(contract.missing.contains_key("a.sol"));

        let mut resolved = BTreeMap::new();
        resolved.insert("a.sol".to_string(), "content".to_string());
        contract.merge_sources(resolved, BTreeMap::new(), BTreeMap::new());
        assert!(contract.missing.is_empty());
        assert!(contract.is_valid());
    }
}
