use std::collections::BTreeMap;
use verifier_types::CheckedContract;

const OUTPUT_SELECTION: &[&str] = &[
    "abi",
    "evm.bytecode.object",
    "evm.bytecode.linkReferences",
    "evm.deployedBytecode.object",
    "evm.deployedBytecode.linkReferences",
    "evm.deployedBytecode.immutableReferences",
];

/// Builds a standard-json compiler input from a checked contract's resolved
/// sources, forcing the output selection to whatever the matcher needs
/// regardless of what the original metadata's settings asked for.
pub fn build_standard_json_input(contract: &CheckedContract) -> serde_json::Value {
    let mut settings = contract.metadata.settings.clone();
    if let Some(object) = settings.as_object_mut() {
        object.insert(
            "outputSelection".to_string(),
            serde_json::json!({ "*": { "*": OUTPUT_SELECTION } }),
        );
    }

    let sources: serde_json::Map<String, serde_json::Value> = contract
        .sources
        .iter()
        .map(|(path, content)| (path.clone(), serde_json::json!({ "content": content })))
        .collect();

    serde_json::json!({
        "language": contract.metadata.language,
        "sources": sources,
        "settings": settings,
    })
}

/// Flattens `settings.libraries` (`{file: {name: "0x..address"}}`) into the
/// same `"file:name"` id space `CompiledArtifacts.link_references` uses.
/// Malformed entries are skipped rather than failing the whole compile —
/// an address the matcher can't find declared just falls back to on-chain
/// recovery.
pub fn parse_library_addresses(settings: &serde_json::Value) -> BTreeMap<String, [u8; 20]> {
    let mut out = BTreeMap::new();
    let Some(libraries) = settings.get("libraries").and_then(|v| v.as_object()) else {
        return out;
    };
    for (file, names) in libraries {
        let Some(names) = names.as_object() else {
            continue;
        };
        for (name, address) in names {
            let Some(address_str) = address.as_str() else {
                continue;
            };
            let Ok(bytes) = hex::decode(address_str.trim_start_matches("0x")) else {
                continue;
            };
            let Ok(array) = <[u8; 20]>::try_from(bytes.as_slice()) else {
                continue;
            };
            out.insert(format!("{file}:{name}"), array);
        }
    }
    out
}
