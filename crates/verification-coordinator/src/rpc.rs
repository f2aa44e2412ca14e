use async_trait::async_trait;
use verifier_types::Address;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("rpc call failed: {0}")]
    Transport(String),
}

/// A chain's code/transaction reader. The concrete JSON-RPC client and the
/// chain-configuration registry that resolves one of these per chain id are
/// both external collaborators — this trait is the only seam this crate
/// needs from them.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Runtime code at `address`. Empty means nothing is deployed there.
    async fn runtime_code(&self, address: Address) -> Result<Vec<u8>, RpcError>;

    /// Best-effort discovery of the transaction that created `address`, via
    /// whatever transaction indexer or scan the implementation has. Callers
    /// tolerate `Ok(None)` and `Err` identically — discovery is optional.
    async fn discover_creator_tx_hash(&self, address: Address) -> Result<Option<String>, RpcError>;

    /// The full calldata of the creation transaction `tx_hash`.
    async fn creation_calldata(&self, tx_hash: &str) -> Result<Vec<u8>, RpcError>;
}

/// Resolves the RPC client for a chain id. A tagged union over a fixed set
/// of chains is equally acceptable; this is the registry shape the
/// coordinator depends on.
pub trait ChainRegistry: Send + Sync {
    fn resolve(&self, chain_id: verifier_types::ChainId) -> Option<std::sync::Arc<dyn RpcClient>>;
}
