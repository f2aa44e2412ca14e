use crate::error::CoordinatorError;
use crate::rpc::{ChainRegistry, RpcClient};
use crate::standard_json::{build_standard_json_input, parse_library_addresses};
use alloy_json_abi::JsonAbi;
use bytecode_matcher::{build_match, BytecodeMatcher};
use compiler_driver::{extract_compiled_artifacts, CompilerDriver};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use verifier_types::{Address, ChainId, CheckedContract, Match};

/// Process-wide `(chainId, address)` single-flight gate plus the collaborators
/// needed to compile and compare a [`CheckedContract`] against on-chain code:
/// a [`ChainRegistry`] resolving one [`crate::rpc::RpcClient`] per chain, a
/// [`CompilerDriver`], and a [`BytecodeMatcher`].
pub struct VerificationCoordinator {
    chains: Arc<dyn ChainRegistry>,
    compiler: Arc<dyn CompilerDriver>,
    matcher: BytecodeMatcher,
    in_flight: Mutex<HashSet<(ChainId, Address)>>,
}

/// Releases its `(chainId, address)` single-flight key on drop, unconditionally
/// — covers both the success and the error-propagation (`?`) exit paths.
struct SingleFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<(ChainId, Address)>>,
    key: (ChainId, Address),
}

impl Drop for SingleFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

impl VerificationCoordinator {
    pub fn new(chains: Arc<dyn ChainRegistry>, compiler: Arc<dyn CompilerDriver>) -> Self {
        Self {
            chains,
            compiler,
            matcher: BytecodeMatcher::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn acquire(&self, key: (ChainId, Address)) -> Result<SingleFlightGuard<'_>, CoordinatorError> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(key) {
            return Err(CoordinatorError::AlreadyVerifying);
        }
        drop(in_flight);
        Ok(SingleFlightGuard {
            in_flight: &self.in_flight,
            key,
        })
    }

    /// `verifyDeployed(contract, chainId, address, creatorTxHash?) -> Match`,
    /// a single attempt with no extra-file-input-bug retry — see
    /// [`Self::verify_deployed_with_recovery`] for the retrying variant.
    pub async fn verify_deployed(
        &self,
        contract: &CheckedContract,
        chain_id: ChainId,
        address: Address,
        creator_tx_hash: Option<String>,
    ) -> Result<Match, CoordinatorError> {
        let _guard = self.acquire((chain_id, address))?;

        let client = self
            .chains
            .resolve(chain_id)
            .ok_or(CoordinatorError::UnsupportedChain(chain_id))?;

        let runtime_code = client.runtime_code(address).await?;
        if runtime_code.is_empty() {
            return Err(CoordinatorError::NotDeployed);
        }

        let creator_tx_hash = match creator_tx_hash {
            Some(hash) => Some(hash),
            None => client.discover_creator_tx_hash(address).await.ok().flatten(),
        };

        let creation_calldata = match &creator_tx_hash {
            Some(hash) => client.creation_calldata(hash).await.ok(),
            None => None,
        };

        let (file, name) = contract.metadata.compilation_target()?;
        let standard_json_input = build_standard_json_input(contract);
        let standard_json_output = self
            .compiler
            .compile(&contract.metadata.compiler.version, &standard_json_input)
            .await?;
        let artifacts = extract_compiled_artifacts(&standard_json_output, file, name)?;
        let library_addresses = parse_library_addresses(&contract.metadata.settings);

        let (runtime_kind, runtime_values, _) =
            self.matcher.classify_runtime(&artifacts, &library_addresses, &runtime_code)?;

        let (creation_kind, creation_values, _, _) = match &creation_calldata {
            Some(calldata) => {
                let constructor_abi = constructor_abi(contract);
                self.matcher.classify_creation(
                    &artifacts,
                    &library_addresses,
                    calldata,
                    constructor_abi.as_ref(),
                )?
            }
            None => (None, Default::default(), None, Vec::new()),
        };

        let message = if runtime_kind.is_none() && creation_kind.is_none() {
            Some("no bytecode at address".to_string())
        } else {
            None
        };

        let mut result = build_match(
            address,
            chain_id,
            runtime_kind,
            creation_kind,
            runtime_values,
            creation_values,
            message,
        );
        result.creator_tx_hash = creator_tx_hash;
        Ok(result)
    }

    /// Runs [`Self::verify_deployed`]; if the outcome is `extra-file-input-bug`,
    /// retries once with `contract.sources` expanded to include every
    /// uploaded file, not just the ones metadata declared. A second
    /// `extra-file-input-bug` is terminal.
    pub async fn verify_deployed_with_recovery(
        &self,
        contract: &CheckedContract,
        all_uploaded_sources: &BTreeMap<String, String>,
        chain_id: ChainId,
        address: Address,
        creator_tx_hash: Option<String>,
    ) -> Result<Match, CoordinatorError> {
        let first = self
            .verify_deployed(contract, chain_id, address, creator_tx_hash.clone())
            .await?;
        if !first.is_extra_file_input_bug() {
            return Ok(first);
        }

        tracing::warn!(chain_id = chain_id.0, address = %address, "extra-file-input-bug, retrying with full upload source set");
        let mut expanded = contract.clone();
        for (path, content) in all_uploaded_sources {
            expanded.sources.entry(path.clone()).or_insert_with(|| content.clone());
        }

        let second = self
            .verify_deployed(&expanded, chain_id, address, creator_tx_hash)
            .await?;
        if second.is_extra_file_input_bug() {
            return Err(CoordinatorError::ExtraFileInputBugPersists);
        }
        Ok(second)
    }
}

fn constructor_abi(contract: &CheckedContract) -> Option<JsonAbi> {
    let abi_value = contract.metadata.abi()?;
    serde_json::from_value(abi_value.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{ChainRegistry, RpcClient, RpcError};
    use async_trait::async_trait;
    use compiler_driver::CompilerDriverError;
    use pretty_assertions::assert_eq;
    use verifier_types::{CompilerInfo, Metadata};

    struct FakeRpcClient {
        code: Vec<u8>,
    }

    #[async_trait]
    impl RpcClient for FakeRpcClient {
        async fn runtime_code(&self, _address: Address) -> Result<Vec<u8>, RpcError> {
            Ok(self.code.clone())
        }

        async fn discover_creator_tx_hash(&self, _address: Address) -> Result<Option<String>, RpcError> {
            Ok(None)
        }

        async fn creation_calldata(&self, _tx_hash: &str) -> Result<Vec<u8>, RpcError> {
            Ok(Vec::new())
        }
    }

    struct FakeChainRegistry {
        client: Option<Arc<dyn RpcClient>>,
    }

    impl ChainRegistry for FakeChainRegistry {
        fn resolve(&self, _chain_id: ChainId) -> Option<Arc<dyn RpcClient>> {
            self.client.clone()
        }
    }

    struct FakeCompilerDriver {
        output: serde_json::Value,
    }

    #[async_trait]
    impl CompilerDriver for FakeCompilerDriver {
        async fn compile(
            &self,
            _version: &str,
            _standard_json_input: &serde_json::Value,
        ) -> Result<serde_json::Value, CompilerDriverError> {
            Ok(self.output.clone())
        }
    }

    fn runtime_code() -> Vec<u8> {
        vec![0x60, 0x80, 0x60, 0x40]
    }

    fn compiler_output_for(runtime_hex: &str) -> serde_json::Value {
        serde_json::json!({
            "contracts": {
                "A.sol": {
                    "A": {
                        "evm": {
                            "bytecode": { "object": "", "linkReferences": {} },
                            "deployedBytecode": {
                                "object": runtime_hex,
                                "linkReferences": {},
                                "immutableReferences": {}
                            }
                        }
                    }
                }
            }
        })
    }

    fn contract() -> CheckedContract {
        CheckedContract::new(Metadata {
            language: "Solidity".to_string(),
            compiler: CompilerInfo {
                version: "0.8.17".to_string(),
            },
            sources: BTreeMap::new(),
            settings: serde_json::json!({"compilationTarget": {"A.sol": "A"}}),
            output: serde_json::Value::Null,
            version: 1,
        })
    }

    fn coordinator(client: Option<Arc<dyn RpcClient>>, output: serde_json::Value) -> VerificationCoordinator {
        VerificationCoordinator::new(
            Arc::new(FakeChainRegistry { client }),
            Arc::new(FakeCompilerDriver { output }),
        )
    }

    #[tokio::test]
    async fn already_in_progress_key_is_rejected_immediately() {
        let coordinator = coordinator(None, serde_json::Value::Null);
        let key = (ChainId(1), Address([0u8; 20]));
        coordinator.in_flight.lock().insert(key);

        let err = coordinator
            .verify_deployed(&contract(), key.0, key.1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::AlreadyVerifying));
    }

    #[tokio::test]
    async fn single_flight_key_is_released_after_the_call_completes() {
        let coordinator = coordinator(None, serde_json::Value::Null);
        let key = (ChainId(1), Address([0u8; 20]));

        let _ = coordinator.verify_deployed(&contract(), key.0, key.1, None).await;
        assert!(!coordinator.in_flight.lock().contains(&key));
    }

    #[tokio::test]
    async fn unresolved_chain_is_rejected() {
        let coordinator = coordinator(None, serde_json::Value::Null);
        let err = coordinator
            .verify_deployed(&contract(), ChainId(1), Address([0u8; 20]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::UnsupportedChain(ChainId(1))));
    }

    #[tokio::test]
    async fn empty_on_chain_code_is_not_deployed() {
        let client: Arc<dyn RpcClient> = Arc::new(FakeRpcClient { code: Vec::new() });
        let coordinator = coordinator(Some(client), serde_json::Value::Null);
        let err = coordinator
            .verify_deployed(&contract(), ChainId(1), Address([0u8; 20]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::NotDeployed));
    }

    #[tokio::test]
    async fn identical_bytecode_end_to_end_is_a_perfect_match() {
        let client: Arc<dyn RpcClient> = Arc::new(FakeRpcClient { code: runtime_code() });
        let output = compiler_output_for(&hex::encode(runtime_code()));
        let coordinator = coordinator(Some(client), output);

        let result = coordinator
            .verify_deployed(&contract(), ChainId(1), Address([0u8; 20]), None)
            .await
            .unwrap();
        assert_eq!(result.runtime_match, Some(verifier_types::MatchType::Perfect));
    }
}
