use crate::rpc::RpcError;
use compiler_driver::CompilerDriverError;
use bytecode_matcher::MatchError;
use thiserror::Error;
use verifier_types::{ChainId, CompilationTargetError};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("a verification for this (chain, address) is already in progress")]
    AlreadyVerifying,
    #[error("chain {0} has no registered RPC client")]
    UnsupportedChain(ChainId),
    #[error("no code deployed at this address")]
    NotDeployed,
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("contract metadata does not name a single compilation target: {0}")]
    CompilationTarget(#[from] CompilationTargetError),
    #[error(transparent)]
    Compile(#[from] CompilerDriverError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("upload is inconsistent: extra-file-input-bug persisted after retrying with the full source set")]
    ExtraFileInputBugPersists,
}
