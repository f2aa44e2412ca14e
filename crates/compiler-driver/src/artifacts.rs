use crate::error::CompilerDriverError;
use std::collections::BTreeMap;
use verifier_types::{ByteRange, CompiledArtifacts};

/// Pulls the creation/runtime bytecode and reference tables for one
/// `(file, contract name)` compilation target out of a raw solc
/// standard-json output, producing decodable [`CompiledArtifacts`].
///
/// Any library slot solc could not statically link is reported in its
/// `linkReferences` output as raw `__$<34 hex>$__` placeholder characters,
/// which do not hex-decode. Those slots are zero-filled here purely to make
/// the bytecode decodable; resolving their real addresses (from the
/// contract's declared library settings, or recovered from on-chain bytes)
/// is left entirely to the bytecode matcher.
pub fn extract_compiled_artifacts(
    standard_json_output: &serde_json::Value,
    file: &str,
    name: &str,
) -> Result<CompiledArtifacts, CompilerDriverError> {
    let contract = standard_json_output
        .get("contracts")
        .and_then(|v| v.get(file))
        .and_then(|v| v.get(name))
        .ok_or_else(|| CompilerDriverError::CompilerError {
            message: format!("no compiled artifact for {file}:{name}"),
        })?;

    let creation_section = contract.get("evm").and_then(|v| v.get("bytecode"));
    let runtime_section = contract.get("evm").and_then(|v| v.get("deployedBytecode"));

    let creation_hex = object_hex(creation_section, file, name)?;
    let runtime_hex = object_hex(runtime_section, file, name)?;

    let creation_link_references = parse_link_references(creation_section);
    let runtime_link_references = parse_link_references(runtime_section);

    // Both halves are produced by the same compilation run, so a library
    // unresolved in one is unresolved in the other; union the two sets of
    // offsets found so either can be linked from a single address table.
    let mut link_references = creation_link_references.clone();
    for (id, ranges) in &runtime_link_references {
        link_references.entry(id.clone()).or_insert_with(|| ranges.clone());
    }

    let immutable_references = parse_immutable_references(runtime_section);

    let creation_bytecode = zero_fill_and_decode(&creation_hex, &creation_link_references)?;
    let runtime_bytecode = zero_fill_and_decode(&runtime_hex, &runtime_link_references)?;

    Ok(CompiledArtifacts {
        runtime_bytecode,
        creation_bytecode,
        immutable_references,
        link_references,
    })
}

fn object_hex(
    section: Option<&serde_json::Value>,
    file: &str,
    name: &str,
) -> Result<String, CompilerDriverError> {
    section
        .and_then(|v| v.get("object"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| CompilerDriverError::CompilerError {
            message: format!("missing bytecode object for {file}:{name}"),
        })
}

fn parse_link_references(section: Option<&serde_json::Value>) -> BTreeMap<String, Vec<ByteRange>> {
    let mut out = BTreeMap::new();
    let Some(by_file) = section.and_then(|v| v.get("linkReferences")).and_then(|v| v.as_object()) else {
        return out;
    };
    for (source_file, by_name) in by_file {
        let Some(by_name) = by_name.as_object() else { continue };
        for (library_name, ranges) in by_name {
            let id = format!("{source_file}:{library_name}");
            out.insert(id, parse_byte_ranges(ranges));
        }
    }
    out
}

fn parse_immutable_references(section: Option<&serde_json::Value>) -> BTreeMap<String, Vec<ByteRange>> {
    let mut out = BTreeMap::new();
    let Some(by_ast_id) = section
        .and_then(|v| v.get("immutableReferences"))
        .and_then(|v| v.as_object())
    else {
        return out;
    };
    for (ast_id, ranges) in by_ast_id {
        out.insert(ast_id.clone(), parse_byte_ranges(ranges));
    }
    out
}

fn parse_byte_ranges(value: &serde_json::Value) -> Vec<ByteRange> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let start = entry.get("start")?.as_u64()? as usize;
                    let length = entry.get("length")?.as_u64()? as usize;
                    Some(ByteRange { start, length })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn zero_fill_and_decode(
    hex_str: &str,
    link_references: &BTreeMap<String, Vec<ByteRange>>,
) -> Result<Vec<u8>, CompilerDriverError> {
    let mut chars: Vec<u8> = hex_str.trim_start_matches("0x").as_bytes().to_vec();
    for ranges in link_references.values() {
        for range in ranges {
            let start = range.start * 2;
            let end = (range.start + range.length) * 2;
            if end > chars.len() {
                continue;
            }
            for c in &mut chars[start..end] {
                *c = b'0';
            }
        }
    }
    hex::decode(&chars).map_err(|err| CompilerDriverError::CompilerError {
        message: format!("compiled bytecode did not hex-decode after placeholder zero-fill: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_output() -> serde_json::Value {
        serde_json::json!({
            "contracts": {
                "Lib.sol": {
                    "Main": {
                        "evm": {
                            "bytecode": {
                                "object": "6080__$1234567890abcdef1234567890abcdef12$__6040",
                                "linkReferences": {
                                    "Lib.sol": {"Lib": [{"start": 2, "length": 20}]}
                                }
                            },
                            "deployedBytecode": {
                                "object": "6080__$1234567890abcdef1234567890abcdef12$__6040",
                                "linkReferences": {
                                    "Lib.sol": {"Lib": [{"start": 2, "length": 20}]}
                                },
                                "immutableReferences": {
                                    "7": [{"start": 0, "length": 2}]
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn extracts_artifacts_and_zero_fills_unresolved_library_slots() {
        let output = sample_output();
        let artifacts = extract_compiled_artifacts(&output, "Lib.sol", "Main").unwrap();

        assert_eq!(artifacts.runtime_bytecode.len(), 24);
        assert_eq!(&artifacts.runtime_bytecode[2..22], &[0u8; 20]);
        assert!(artifacts.link_references.contains_key("Lib.sol:Lib"));
        assert!(artifacts.immutable_references.contains_key("7"));
    }

    #[test]
    fn missing_contract_is_a_compiler_error() {
        let output = sample_output();
        let result = extract_compiled_artifacts(&output, "Other.sol", "Missing");
        assert!(result.is_err());
    }
}
