//! Partitions an arbitrary batch of uploaded files into metadata-anchored
//! [`CheckedContract`]s plus whatever input wasn't claimed by any of them.

use std::collections::{BTreeMap, BTreeSet};
use verifier_types::{keccak256, CheckedContract, Metadata, MissingReason};

/// One uploaded file, identified by its own path within the upload.
pub struct UploadedFile<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
}

/// Recognizes a byte buffer as compiler metadata: it must parse as JSON and
/// carry every key [`Metadata::REQUIRED_TOP_LEVEL_KEYS`] names, so an
/// ordinary source file that happens to parse as JSON isn't misclassified.
fn parse_metadata(content: &[u8]) -> Option<Metadata> {
    let value: serde_json::Value = serde_json::from_slice(content).ok()?;
    let object = value.as_object()?;
    if !Metadata::REQUIRED_TOP_LEVEL_KEYS
        .iter()
        .all(|key| object.contains_key(*key))
    {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// `checkFiles`: heuristically finds every metadata file in `files`, builds
/// a [`CheckedContract`] per one by matching each declared source's
/// keccak256 against the uploaded buffers, and reports whatever paths no
/// contract claimed.
///
/// Returns `(vec![], all paths)` if no file in the upload parses as
/// metadata.
pub fn check_files(files: &[UploadedFile<'_>]) -> (Vec<CheckedContract>, Vec<String>) {
    let digests: BTreeMap<[u8; 32], &str> = files
        .iter()
        .map(|f| (keccak256(f.content), f.path))
        .collect();

    let mut used: BTreeSet<String> = BTreeSet::new();
    let mut contracts = Vec::new();

    for file in files {
        let Some(metadata) = parse_metadata(file.content) else {
            continue;
        };

        let mut contract = CheckedContract::new(metadata.clone());
        for (path, source) in &metadata.sources {
            match digests.get(&source.keccak256) {
                Some(found_path) => {
                    let content = files
                        .iter()
                        .find(|f| &f.path == found_path)
                        .expect("path came from the digest index built over the same files");
                    contract
                        .sources
                        .insert(path.clone(), String::from_utf8_lossy(content.content).into_owned());
                    used.insert(found_path.to_string());
                }
                None => {
                    contract
                        .missing
                        .insert(path.clone(), MissingReason::NotFoundInUpload);
                }
            }
        }
        used.insert(file.path.to_string());
        contracts.push(contract);
    }

    if contracts.is_empty() {
        tracing::debug!("no metadata file found in upload");
        return (Vec::new(), files.iter().map(|f| f.path.to_string()).collect());
    }

    let unused = files
        .iter()
        .map(|f| f.path.to_string())
        .filter(|path| !used.contains(path))
        .collect();

    (contracts, unused)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use verifier_types::CompilerInfo;

    fn metadata_json(source_path: &str, source_keccak: [u8; 32]) -> String {
        serde_json::json!({
            "language": "Solidity",
            "compiler": {"version": "0.8.17"},
            "settings": {},
            "sources": {
                source_path: {"keccak256": format!("0x{}", hex::encode(source_keccak))}
            }
        })
        .to_string()
    }

    #[test]
    fn claims_matching_source_and_reports_the_rest_as_unused() {
        let source = b"contract C {}".to_vec();
        let digest = keccak256(&source);
        let metadata = metadata_json("C.sol", digest);

        let files = vec![
            UploadedFile {
                path: "metadata.json",
                content: metadata.as_bytes(),
            },
            UploadedFile {
                path: "C.sol",
                content: &source,
            },
            UploadedFile {
                path: "unrelated.txt",
                content: b"not referenced",
            },
        ];

        let (contracts, unused) = check_files(&files);
        assert_eq!(contracts.len(), 1);
        assert!(contracts[0].sources.contains_key("C.sol"));
        assert!(contracts[0].missing.is_empty());
        assert_eq!(unused, vec!["unrelated.txt".to_string()]);
    }

    #[test]
    fn marks_source_missing_when_no_upload_matches_the_declared_hash() {
        let metadata = metadata_json("C.sol", [0xAB; 32]);
        let files = vec![UploadedFile {
            path: "metadata.json",
            content: metadata.as_bytes(),
        }];

        let (contracts, _) = check_files(&files);
        assert_eq!(contracts.len(), 1);
        assert!(contracts[0].missing.contains_key("C.sol"));
    }

    #[test]
    fn no_metadata_file_leaves_everything_unused() {
        let files = vec![UploadedFile {
            path: "C.sol",
            content: b"contract C {}",
        }];
        let (contracts, unused) = check_files(&files);
        assert!(contracts.is_empty());
        assert_eq!(unused, vec!["C.sol".to_string()]);
    }

    #[test]
    fn checked_contract_carries_the_parsed_compiler_version() {
        let source = b"contract C {}".to_vec();
        let digest = keccak256(&source);
        let metadata = metadata_json("C.sol", digest);
        let files = vec![
            UploadedFile {
                path: "metadata.json",
                content: metadata.as_bytes(),
            },
            UploadedFile {
                path: "C.sol",
                content: &source,
            },
        ];
        let (contracts, _) = check_files(&files);
        assert_eq!(
            contracts[0].metadata.compiler,
            CompilerInfo {
                version: "0.8.17".to_string()
            }
        );
    }
}
