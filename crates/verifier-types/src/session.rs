use crate::chain::{Address, ChainId};
use crate::checked_contract::CheckedContract;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum cumulative size of a session's staged input files.
pub const MAX_SESSION_BYTES: u64 = 50 * 1024 * 1024;

/// A byte-for-byte unique upload, keyed by `sha1(content)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    pub path: String,
    pub content: Vec<u8>,
}

/// A target to run verification against once its contract becomes valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationTarget {
    pub address: Address,
    pub chain_id: ChainId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_tx_hash: Option<String>,
}

/// Outcome recorded against a staged contract after a `verifyReady` sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum VerificationStatus {
    NotReady,
    InProgress,
    Verified {
        #[serde(flatten)]
        result: crate::match_result::Match,
    },
    Failed {
        message: String,
    },
}

/// A staged contract tracked by a [`Session`]: the `CheckedContract` being
/// assembled, its verification target (once set), and its latest status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StagedContract {
    pub contract: CheckedContract,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<VerificationTarget>,
    pub status: VerificationStatus,
}

/// Server-side accumulation of uploads across requests, keyed by client
/// session id by the owning session store.
///
/// Invariant: total byte size of `input_files` stays at or below
/// [`MAX_SESSION_BYTES`]; `content_id = sha1(content)`,
/// `metadata_id = sha1(metadata.rawBytes)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub input_files: BTreeMap<String, InputFile>,
    pub contracts: BTreeMap<String, StagedContract>,
    pub unused_sources: Vec<String>,
    total_bytes: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("payload too large: {attempted} bytes exceeds {} byte session cap", MAX_SESSION_BYTES)]
    PayloadTooLarge { attempted: u64 },
}

impl Session {
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Computes `sha1(content)`, hex-encoded, as used for both
    /// `content_id` and `metadata_id`.
    pub fn sha1_id(content: &[u8]) -> String {
        use sha1::{Digest, Sha1};
        let mut hasher = Sha1::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Dedupes incoming files by their content id and appends them,
    /// rejecting the whole batch if it would push cumulative size over the
    /// cap. Returns the content ids that were newly added.
    pub fn add_files(
        &mut self,
        files: Vec<InputFile>,
    ) -> Result<Vec<String>, SessionError> {
        let mut added = Vec::new();
        let mut incremental = 0u64;
        let mut staged = Vec::new();
        for file in files {
            let id = Self::sha1_id(&file.content);
            if self.input_files.contains_key(&id) {
                continue;
            }
            incremental += file.content.len() as u64;
            staged.push((id, file));
        }
        let attempted = self.total_bytes + incremental;
        if attempted > MAX_SESSION_BYTES {
            return Err(SessionError::PayloadTooLarge { attempted });
        }
        for (id, file) in staged {
            self.input_files.insert(id.clone(), file);
            added.push(id);
        }
        self.total_bytes = attempted;
        Ok(added)
    }
}
