use crate::library::{link_libraries, LinkError};
use crate::trailer::split_metadata_trailer;
use crate::transformation::{MatchValues, Transformation};
use alloy_dyn_abi::JsonAbiExt;
use alloy_json_abi::JsonAbi;
use std::collections::BTreeMap;
use thiserror::Error;
use verifier_types::{ByteRange, CompiledArtifacts, Match, MatchType};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error("constructor arguments did not ABI-decode against the declared constructor: {0}")]
    ConstructorDecode(String),
}

/// One half (runtime or creation) of a classification outcome, before it is
/// folded into the final [`Match`].
struct HalfMatch {
    kind: Option<MatchType>,
    values: MatchValues,
    transformations: Vec<Transformation>,
}

/// Compares compiled bytecode against on-chain bytecode and classifies the
/// outcome, following the same normalize-then-compare shape as the alliance
/// matcher this is ported from: link libraries, strip the metadata trailer,
/// mask immutables, then decide perfect/partial/extra-file-input-bug/null.
#[derive(Default)]
pub struct BytecodeMatcher;

impl BytecodeMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_runtime(
        &self,
        artifacts: &CompiledArtifacts,
        library_addresses: &BTreeMap<String, [u8; 20]>,
        on_chain_runtime: &[u8],
    ) -> Result<(Option<MatchType>, MatchValues, Vec<Transformation>), MatchError> {
        let half = self.match_one(
            &artifacts.runtime_bytecode,
            &artifacts.link_references,
            &artifacts.immutable_references,
            library_addresses,
            on_chain_runtime,
        )?;
        Ok((half.kind, half.values, half.transformations))
    }

    /// Creation code is compared on its compiled-length prefix; anything the
    /// on-chain creation transaction's calldata carries beyond that prefix is
    /// the ABI-encoded constructor argument tail, which is only decoded once
    /// the body itself has matched.
    pub fn classify_creation(
        &self,
        artifacts: &CompiledArtifacts,
        library_addresses: &BTreeMap<String, [u8; 20]>,
        on_chain_creation_calldata: &[u8],
        constructor_abi: Option<&JsonAbi>,
    ) -> Result<(Option<MatchType>, MatchValues, Option<Vec<u8>>, Vec<Transformation>), MatchError> {
        let compiled_len = artifacts.creation_bytecode.len();
        let compare_len = compiled_len.min(on_chain_creation_calldata.len());
        let on_chain_prefix = &on_chain_creation_calldata[..compare_len];

        let mut half = self.match_one(
            &artifacts.creation_bytecode,
            &artifacts.link_references,
            &BTreeMap::new(),
            library_addresses,
            on_chain_prefix,
        )?;

        if half.kind.is_none() {
            return Ok((None, half.values, None, half.transformations));
        }

        let tail = if on_chain_creation_calldata.len() > compiled_len {
            &on_chain_creation_calldata[compiled_len..]
        } else {
            &[][..]
        };

        let constructor_arguments = if tail.is_empty() {
            None
        } else {
            if let Some(abi) = constructor_abi {
                if let Some(constructor) = &abi.constructor {
                    constructor
                        .abi_decode_input(tail, true)
                        .map_err(|e| MatchError::ConstructorDecode(e.to_string()))?;
                }
            }
            half.values.set_constructor_arguments(tail.to_vec());
            Some(tail.to_vec())
        };

        Ok((half.kind, half.values, constructor_arguments, half.transformations))
    }

    /// Shared normalize-and-compare core for both runtime and creation code:
    /// link libraries, strip the metadata trailer, mask immutables, then
    /// classify the bodies.
    fn match_one(
        &self,
        compiled: &[u8],
        link_references: &BTreeMap<String, Vec<ByteRange>>,
        immutable_references: &BTreeMap<String, Vec<ByteRange>>,
        library_addresses: &BTreeMap<String, [u8; 20]>,
        on_chain: &[u8],
    ) -> Result<HalfMatch, MatchError> {
        if on_chain.is_empty() {
            return Ok(HalfMatch {
                kind: None,
                values: MatchValues::default(),
                transformations: Vec::new(),
            });
        }

        let mut compiled = compiled.to_vec();
        let mut transformations = Vec::new();
        let mut values = MatchValues::default();
        let mut recovered = BTreeMap::new();

        // Library linking only covers the overlapping prefix; out-of-range
        // offsets beyond a shorter on-chain code are reported as a link
        // error rather than silently skipped.
        let link_len = compiled.len().min(on_chain.len());
        link_libraries(
            &mut compiled[..link_len],
            link_references,
            library_addresses,
            &on_chain[..link_len],
            &mut transformations,
            &mut values,
            &mut recovered,
        )?;

        let (compiled_body, compiled_trailer) = split_metadata_trailer(&compiled);
        let (on_chain_body, on_chain_trailer) = split_metadata_trailer(on_chain);

        let mut compiled_body_masked = compiled_body.to_vec();
        let mut on_chain_body_masked = on_chain_body.to_vec();

        for (id, ranges) in immutable_references {
            for range in ranges {
                let start = range.start;
                let end = start + range.length;
                if compiled_body_masked.len() < end || on_chain_body_masked.len() < end {
                    continue;
                }
                values.add_immutable(id.clone(), on_chain_body_masked[start..end].to_vec());
                transformations.push(Transformation::immutable(start, id.clone()));
                for b in &mut compiled_body_masked[start..end] {
                    *b = 0;
                }
                for b in &mut on_chain_body_masked[start..end] {
                    *b = 0;
                }
            }
        }

        let kind = classify_bodies(
            &compiled_body_masked,
            &on_chain_body_masked,
            compiled_trailer,
            on_chain_trailer,
        );

        Ok(HalfMatch {
            kind,
            values,
            transformations,
        })
    }
}

/// Applies the tie-break rule: a present `creation_match` is authoritative,
/// but both halves are always preserved on the returned [`Match`].
pub fn tie_break(runtime_match: Option<MatchType>, creation_match: Option<MatchType>) -> Option<MatchType> {
    creation_match.or(runtime_match)
}

fn classify_bodies(
    compiled_body: &[u8],
    on_chain_body: &[u8],
    compiled_trailer: &[u8],
    on_chain_trailer: &[u8],
) -> Option<MatchType> {
    use std::cmp::Ordering;

    match compiled_body.len().cmp(&on_chain_body.len()) {
        Ordering::Equal => {
            if compiled_body != on_chain_body {
                return None;
            }
            if compiled_trailer == on_chain_trailer {
                Some(MatchType::Perfect)
            } else {
                Some(MatchType::Partial)
            }
        }
        Ordering::Less => {
            // Compiled is shorter: the EVM zero-pads short creation returns,
            // so the on-chain tail must be all zeros for this to count.
            if on_chain_body.starts_with(compiled_body)
                && on_chain_body[compiled_body.len()..].iter().all(|&b| b == 0)
            {
                Some(MatchType::Perfect)
            } else {
                None
            }
        }
        Ordering::Greater => {
            if compiled_body.starts_with(on_chain_body) {
                Some(MatchType::ExtraFileInputBug)
            } else {
                None
            }
        }
    }
}

/// Assembles the final [`Match`] from the two halves, applying the tie-break
/// rule and merging recovered library/immutable values from whichever half
/// (or both) produced them.
#[allow(clippy::too_many_arguments)]
pub fn build_match(
    address: verifier_types::Address,
    chain_id: verifier_types::ChainId,
    runtime_match: Option<MatchType>,
    creation_match: Option<MatchType>,
    runtime_values: MatchValues,
    creation_values: MatchValues,
    message: Option<String>,
) -> Match {
    let mut library_map = BTreeMap::new();
    for (id, bytes) in runtime_values.libraries.iter().chain(creation_values.libraries.iter()) {
        if let Ok(address) = <[u8; 20]>::try_from(bytes.as_slice()) {
            library_map.insert(id.clone(), verifier_types::Address(address));
        }
    }

    let mut immutable_references = BTreeMap::new();
    for (id, bytes) in runtime_values.immutables.iter().chain(creation_values.immutables.iter()) {
        immutable_references.insert(id.clone(), bytes.clone());
    }

    let abi_encoded_constructor_arguments = creation_values.constructor_arguments.clone();

    Match {
        address,
        chain_id,
        runtime_match,
        creation_match,
        library_map,
        immutable_references,
        abi_encoded_constructor_arguments,
        creator_tx_hash: None,
        storage_timestamp: None,
        message,
    }
}
