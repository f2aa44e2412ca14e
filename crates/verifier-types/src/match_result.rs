use crate::chain::{Address, ChainId};
use crate::hex_serde;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of comparing compiled bytecode against on-chain bytecode, for
/// either the runtime or the creation half of a [`Match`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Perfect,
    Partial,
    ExtraFileInputBug,
}

/// The repository partition a [`Match`] belongs to, derived from
/// `runtime_match.or(creation_match)` — a contract with only `creation_match`
/// set is treated exactly like one with only `runtime_match` set, per the
/// unification called for between the matcher and the lookup short-circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Full,
    Partial,
}

impl MatchQuality {
    pub fn partition_dir(&self) -> &'static str {
        match self {
            MatchQuality::Full => "full_match",
            MatchQuality::Partial => "partial_match",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub address: Address,
    pub chain_id: ChainId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_match: Option<MatchType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_match: Option<MatchType>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub library_map: BTreeMap<String, Address>,
    #[serde(with = "hex_serde::map_vec", skip_serializing_if = "BTreeMap::is_empty")]
    pub immutable_references: BTreeMap<String, Vec<u8>>,
    #[serde(with = "hex_serde::map_vec::option", skip_serializing_if = "Option::is_none")]
    pub abi_encoded_constructor_arguments: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Match {
    /// `None` when neither half matched at all — a caller-visible failure,
    /// never stored.
    pub fn quality(&self) -> Option<MatchQuality> {
        let best = self.creation_match.or(self.runtime_match)?;
        Some(match best {
            MatchType::Perfect => MatchQuality::Full,
            MatchType::Partial | MatchType::ExtraFileInputBug => MatchQuality::Partial,
        })
    }

    pub fn is_extra_file_input_bug(&self) -> bool {
        matches!(self.runtime_match, Some(MatchType::ExtraFileInputBug))
            || matches!(self.creation_match, Some(MatchType::ExtraFileInputBug))
    }
}
