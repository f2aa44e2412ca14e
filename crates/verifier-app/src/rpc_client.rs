use crate::config::ChainSettings;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use verification_coordinator::{ChainRegistry, RpcClient, RpcError};
use verifier_types::{Address, ChainId};

/// Thin JSON-RPC client for `eth_getCode`/`eth_getTransactionByHash`, plus
/// an Etherscan-compatible explorer lookup for the creator transaction
/// hash. One instance is constructed per configured chain.
pub struct JsonRpcClient {
    http: reqwest::Client,
    rpc_url: url::Url,
    explorer_api_url: Option<url::Url>,
    explorer_api_key: Option<String>,
}

impl JsonRpcClient {
    pub fn new(settings: &ChainSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: settings.rpc_url.clone(),
            explorer_api_url: settings.explorer_api_url.clone(),
            explorer_api_key: settings.explorer_api_key.clone(),
        }
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(self.rpc_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| RpcError::Transport(err.to_string()))?;
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|err| RpcError::Transport(err.to_string()))?;
        if let Some(error) = payload.get("error") {
            return Err(RpcError::Transport(error.to_string()));
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::Transport("json-rpc response carried no result".to_string()))
    }
}

fn decode_hex_field(value: &serde_json::Value) -> Result<Vec<u8>, RpcError> {
    let hex_str = value
        .as_str()
        .ok_or_else(|| RpcError::Transport("expected a hex string".to_string()))?;
    hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|err| RpcError::Transport(err.to_string()))
}

#[async_trait]
impl RpcClient for JsonRpcClient {
    async fn runtime_code(&self, address: Address) -> Result<Vec<u8>, RpcError> {
        let result = self
            .call("eth_getCode", serde_json::json!([address.to_string(), "latest"]))
            .await?;
        decode_hex_field(&result)
    }

    async fn discover_creator_tx_hash(&self, address: Address) -> Result<Option<String>, RpcError> {
        let Some(explorer_api_url) = &self.explorer_api_url else {
            return Ok(None);
        };
        let mut url = explorer_api_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("module", "contract");
            query.append_pair("action", "getcontractcreation");
            query.append_pair("contractaddresses", &address.to_string());
            if let Some(key) = &self.explorer_api_key {
                query.append_pair("apikey", key);
            }
        }
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| RpcError::Transport(err.to_string()))?;
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|err| RpcError::Transport(err.to_string()))?;
        let tx_hash = payload
            .get("result")
            .and_then(|result| result.as_array())
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.get("txHash"))
            .and_then(|tx_hash| tx_hash.as_str())
            .map(str::to_string);
        Ok(tx_hash)
    }

    async fn creation_calldata(&self, tx_hash: &str) -> Result<Vec<u8>, RpcError> {
        let result = self
            .call("eth_getTransactionByHash", serde_json::json!([tx_hash]))
            .await?;
        let input = result
            .get("input")
            .ok_or_else(|| RpcError::Transport("transaction has no input field".to_string()))?;
        decode_hex_field(input)
    }
}

/// Resolves one [`JsonRpcClient`] per chain id, built once at startup from
/// [`crate::config::VerifierConfig::chains`].
pub struct ConfiguredChainRegistry {
    clients: HashMap<ChainId, Arc<dyn RpcClient>>,
}

impl ConfiguredChainRegistry {
    pub fn from_settings(chains: &HashMap<String, ChainSettings>) -> anyhow::Result<Self> {
        let mut clients = HashMap::new();
        for (chain_id_str, settings) in chains {
            let chain_id: u64 = chain_id_str
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid chain id key: {chain_id_str}"))?;
            clients.insert(ChainId(chain_id), Arc::new(JsonRpcClient::new(settings)) as Arc<dyn RpcClient>);
        }
        Ok(Self { clients })
    }
}

impl ChainRegistry for ConfiguredChainRegistry {
    fn resolve(&self, chain_id: ChainId) -> Option<Arc<dyn RpcClient>> {
        self.clients.get(&chain_id).cloned()
    }
}
