use crate::hex_serde;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One entry of a compiler metadata's `sources` map.
///
/// Invariant: if `content` is set, `keccak256(content) == keccak256`. This is
/// checked by [`SourceEntry::validate_content`], not enforced at construction
/// time, because entries commonly arrive over the wire with only `urls` set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(with = "hex_serde::array32")]
    pub keccak256: [u8; 32],
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("declared keccak256 does not match content")]
pub struct ContentHashMismatch;

impl SourceEntry {
    /// Verifies the `content`/`keccak256` invariant, if content is present.
    pub fn validate_content(&self) -> Result<(), ContentHashMismatch> {
        match &self.content {
            Some(content) => {
                let actual = keccak256(content.as_bytes());
                if actual == self.keccak256 {
                    Ok(())
                } else {
                    Err(ContentHashMismatch)
                }
            }
            None => Ok(()),
        }
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    use sha3::{Digest, Keccak256};
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Parsed compiler-emitted metadata JSON.
///
/// Invariant: `settings.compilation_target` names exactly one source path
/// and contract name — enforced by [`Metadata::compilation_target`], which is
/// the only supported way to read it back out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub language: String,
    pub compiler: CompilerInfo,
    pub sources: BTreeMap<String, SourceEntry>,
    pub settings: serde_json::Value,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompilerInfo {
    pub version: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompilationTargetError {
    #[error("settings.compilationTarget is missing")]
    Missing,
    #[error("settings.compilationTarget names {0} targets, expected exactly one")]
    NotSingular(usize),
}

impl Metadata {
    /// The keys a file must carry at its top level to be recognized as
    /// compiler metadata rather than an ordinary source file.
    pub const REQUIRED_TOP_LEVEL_KEYS: [&'static str; 4] =
        ["language", "compiler", "settings", "sources"];

    /// Returns `(source_path, contract_name)`, the single compilation target.
    pub fn compilation_target(&self) -> Result<(&str, &str), CompilationTargetError> {
        let target = self
            .settings
            .get("compilationTarget")
            .and_then(|v| v.as_object())
            .ok_or(CompilationTargetError::Missing)?;
        if target.len() != 1 {
            return Err(CompilationTargetError::NotSingular(target.len()));
        }
        let (path, contract_name) = target.iter().next().expect("checked len == 1 above");
        let contract_name = contract_name
            .as_str()
            .ok_or(CompilationTargetError::Missing)?;
        Ok((path.as_str(), contract_name))
    }

    pub fn abi(&self) -> Option<&serde_json::Value> {
        self.output.get("abi")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validates_matching_content() {
        let content = "contract C {}";
        let entry = SourceEntry {
            keccak256: keccak256(content.as_bytes()),
            urls: vec![],
            content: Some(content.to_string()),
            license: None,
        };
        assert_eq!(entry.validate_content(), Ok(()));
    }

    #[test]
    fn rejects_mismatching_content() {
        let entry = SourceEntry {
            keccak256: [0u8; 32],
            urls: vec![],
            content: Some("contract C {}".to_string()),
            license: None,
        };
        assert_eq!(entry.validate_content(), Err(ContentHashMismatch));
    }

    #[test]
    fn extracts_single_compilation_target() {
        let metadata = Metadata {
            language: "Solidity".to_string(),
            compiler: CompilerInfo {
                version: "0.8.17+commit.8df45f5f".to_string(),
            },
            sources: BTreeMap::new(),
            settings: serde_json::json!({
                "compilationTarget": {"contracts/Foo.sol": "Foo"}
            }),
            output: serde_json::Value::Null,
            version: 1,
        };
        assert_eq!(
            metadata.compilation_target().unwrap(),
            ("contracts/Foo.sol", "Foo")
        );
    }

    #[test]
    fn rejects_multiple_compilation_targets() {
        let metadata = Metadata {
            language: "Solidity".to_string(),
            compiler: CompilerInfo {
                version: "0.8.17".to_string(),
            },
            sources: BTreeMap::new(),
            settings: serde_json::json!({
                "compilationTarget": {"a.sol": "A", "b.sol": "B"}
            }),
            output: serde_json::Value::Null,
            version: 1,
        };
        assert_eq!(
            metadata.compilation_target().unwrap_err(),
            CompilationTargetError::NotSingular(2)
        );
    }
}
