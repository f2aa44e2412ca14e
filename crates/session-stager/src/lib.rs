//! Per-session accumulation of uploads across requests: holds partially
//! specified contracts keyed by content-hash of their own metadata file,
//! applies incoming files incrementally, and re-attempts verification once a
//! contract becomes valid and targeted.

mod error;

pub use error::StagerError;

use contract_checker::{check_files, UploadedFile};
use match_store::MatchStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use verification_coordinator::VerificationCoordinator;
use verifier_types::{
    Address, ChainId, InputFile, Metadata, Session, StagedContract, VerificationStatus,
    VerificationTarget,
};

const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: Session,
    last_touched: Instant,
}

impl SessionEntry {
    fn fresh() -> Self {
        Self {
            session: Session::default(),
            last_touched: Instant::now(),
        }
    }
}

/// A single verification target accepted by [`SessionStager::set_verification_targets`].
pub struct TargetAssignment {
    pub contract_id: String,
    pub address: Address,
    pub chain_id: ChainId,
    pub creator_tx_hash: Option<String>,
}

/// Client-facing view of one staged contract, returned by
/// [`SessionStager::snapshot`].
#[derive(Debug, Serialize)]
pub struct ContractSnapshot {
    pub id: String,
    pub is_valid: bool,
    pub target: Option<VerificationTarget>,
    pub status: VerificationStatus,
}

/// Client-facing view of the whole session, returned by
/// [`SessionStager::snapshot`].
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub contracts: Vec<ContractSnapshot>,
    pub unused_sources: Vec<String>,
}

/// Server-side store of per-session state, keyed by an opaque client session
/// id. Mutations against a single session id are serialized by the session's
/// own `tokio::sync::Mutex`; idle sessions are dropped by
/// [`Self::spawn_idle_sweeper`].
pub struct SessionStager {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_ttl: Duration,
}

impl SessionStager {
    pub fn new() -> Arc<Self> {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        })
    }

    /// Spawns a background task that periodically drops sessions untouched
    /// for longer than `idle_ttl`. The returned handle may be dropped or
    /// aborted to stop the sweep; it otherwise runs for the process
    /// lifetime.
    pub fn spawn_idle_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let stager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(stager.idle_ttl / 2);
            loop {
                interval.tick().await;
                stager.sweep_idle().await;
            }
        })
    }

    async fn sweep_idle(&self) {
        let mut sessions = self.sessions.lock().await;
        let idle_ttl = self.idle_ttl;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_touched.elapsed() < idle_ttl);
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::debug!(swept, "dropped idle sessions");
        }
    }

    /// `addFiles`: dedupes `files` into the session's upload set (rejecting
    /// the whole batch with `payload-too-large` if it would exceed the
    /// session cap), then re-runs contract recognition over the *entire*
    /// accumulated upload set, merging newly-discovered sources into each
    /// contract's existing entry without ever overwriting an already
    /// validated source.
    pub async fn add_files(
        &self,
        session_id: &str,
        files: Vec<InputFile>,
    ) -> Result<Vec<String>, StagerError> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::fresh);
        entry.last_touched = Instant::now();

        let added = entry.session.add_files(files)?;

        let uploaded: Vec<UploadedFile<'_>> = entry
            .session
            .input_files
            .values()
            .map(|file| UploadedFile {
                path: &file.path,
                content: &file.content,
            })
            .collect();
        let (contracts, unused) = check_files(&uploaded);
        entry.session.unused_sources = unused;

        for contract in contracts {
            let id = metadata_content_id(&entry.session, &contract.metadata);
            match entry.session.contracts.get_mut(&id) {
                Some(existing) => {
                    existing
                        .contract
                        .merge_sources(contract.sources, contract.missing, contract.invalid);
                }
                None => {
                    entry.session.contracts.insert(
                        id,
                        StagedContract {
                            contract,
                            target: None,
                            status: VerificationStatus::NotReady,
                        },
                    );
                }
            }
        }

        Ok(added)
    }

    /// `setVerificationTargets`: associates a verification target with each
    /// named staged contract. Targets naming an id this session hasn't
    /// staged are reported back as unknown, the rest are still applied.
    pub async fn set_verification_targets(
        &self,
        session_id: &str,
        targets: Vec<TargetAssignment>,
    ) -> Result<(), StagerError> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::fresh);
        entry.last_touched = Instant::now();

        let mut unknown = None;
        for assignment in targets {
            match entry.session.contracts.get_mut(&assignment.contract_id) {
                Some(staged) => {
                    staged.target = Some(VerificationTarget {
                        address: assignment.address,
                        chain_id: assignment.chain_id,
                        creator_tx_hash: assignment.creator_tx_hash,
                    });
                }
                None => unknown.get_or_insert(assignment.contract_id),
            };
        }
        match unknown {
            Some(id) => Err(StagerError::UnknownContract(id)),
            None => Ok(()),
        }
    }

    /// `verifyReady`: for every staged contract that is valid and has a
    /// verification target set, checks [`MatchStore`] first and otherwise
    /// runs [`VerificationCoordinator`], recording the outcome on the
    /// entry's status. A [`MatchStore`] hit short-circuits compilation
    /// entirely.
    pub async fn verify_ready(
        &self,
        session_id: &str,
        coordinator: &VerificationCoordinator,
        store: &MatchStore,
    ) {
        let mut sessions = self.sessions.lock().await;
        let Some(entry) = sessions.get_mut(session_id) else {
            return;
        };
        entry.last_touched = Instant::now();

        let all_uploaded_sources: std::collections::BTreeMap<String, String> = entry
            .session
            .input_files
            .values()
            .map(|file| (file.path.clone(), String::from_utf8_lossy(&file.content).into_owned()))
            .collect();

        for staged in entry.session.contracts.values_mut() {
            let Some(target) = staged.target.clone() else {
                continue;
            };
            if !staged.contract.is_valid() {
                continue;
            }

            match store.lookup(target.chain_id, target.address).await {
                Ok(matches) => {
                    if let Some(found) = matches.into_iter().next() {
                        staged.status = VerificationStatus::Verified { result: found };
                        continue;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "match store lookup failed, falling through to compile");
                }
            }

            staged.status = VerificationStatus::InProgress;
            let outcome = coordinator
                .verify_deployed_with_recovery(
                    &staged.contract,
                    &all_uploaded_sources,
                    target.chain_id,
                    target.address,
                    target.creator_tx_hash.clone(),
                )
                .await;

            staged.status = match outcome {
                Ok(result) => {
                    if let Err(err) = store.store(&staged.contract, &result).await {
                        tracing::warn!(error = %err, "failed to persist verified match");
                    }
                    VerificationStatus::Verified { result }
                }
                Err(err) => VerificationStatus::Failed {
                    message: err.to_string(),
                },
            };
        }
    }

    /// `snapshot`: serializes the session's current state for the client.
    pub async fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        let sessions = self.sessions.lock().await;
        let entry = sessions.get(session_id)?;
        let contracts = entry
            .session
            .contracts
            .iter()
            .map(|(id, staged)| ContractSnapshot {
                id: id.clone(),
                is_valid: staged.contract.is_valid(),
                target: staged.target.clone(),
                status: staged.status.clone(),
            })
            .collect();
        Some(SessionSnapshot {
            contracts,
            unused_sources: entry.session.unused_sources.clone(),
        })
    }
}

impl Default for SessionStager {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }
}

/// The declared key for a staged contract is `sha1(metadata.rawBytes)` —
/// the raw bytes of the uploaded metadata *file*, not a re-serialization of
/// the parsed [`Metadata`]. Recovers that upload by matching the parsed
/// metadata structurally against every still-unclaimed upload, since
/// `ContractChecker` doesn't itself expose which input file produced a
/// given `CheckedContract`.
fn metadata_content_id(session: &Session, metadata: &Metadata) -> String {
    for file in session.input_files.values() {
        if parses_to(&file.content, metadata) {
            return Session::sha1_id(&file.content);
        }
    }
    Session::sha1_id(&serde_json::to_vec(metadata).unwrap_or_default())
}

fn parses_to(content: &[u8], metadata: &Metadata) -> bool {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(content) else {
        return false;
    };
    let Some(object) = value.as_object() else {
        return false;
    };
    if !Metadata::REQUIRED_TOP_LEVEL_KEYS
        .iter()
        .all(|key| object.contains_key(*key))
    {
        return false;
    }
    match serde_json::from_value::<Metadata>(value) {
        Ok(parsed) => &parsed == metadata,
        Err(_) => false,
    }
}
