//! Shared data model for the contract verification pipeline: chain
//! identifiers, compiler metadata, checked contracts, match results,
//! pending (fetch-in-progress) contracts and session state.

pub mod chain;
pub mod checked_contract;
pub mod hex_serde;
pub mod match_result;
pub mod metadata;
pub mod pending_contract;
pub mod session;

pub use chain::{Address, ChainId};
pub use checked_contract::{ByteRange, CheckedContract, CompiledArtifacts, InvalidSource, MissingReason};
pub use match_result::{Match, MatchQuality, MatchType};
pub use metadata::{keccak256, CompilationTargetError, CompilerInfo, Metadata, SourceEntry};
pub use pending_contract::PendingContract;
pub use session::{InputFile, Session, SessionError, StagedContract, VerificationStatus, VerificationTarget};
