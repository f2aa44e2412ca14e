use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Selects between the local svm-managed compiler and a remote compile
/// function.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LambdaCompilerSettings {
    pub enabled: bool,
    pub url: Option<url::Url>,
}

impl Default for LambdaCompilerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositoryV1Settings {
    pub path: PathBuf,
    pub server_url: Option<url::Url>,
}

impl Default for RepositoryV1Settings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./repository"),
            server_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct IpfsSettings {
    pub gateway: String,
    pub api: Option<String>,
}

impl Default for IpfsSettings {
    fn default() -> Self {
        Self {
            gateway: "https://ipfs.io/ipfs".to_string(),
            api: None,
        }
    }
}

/// Per-chain RPC endpoint plus an optional explorer API used to discover a
/// contract's creator transaction hash.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChainSettings {
    pub rpc_url: url::Url,
    #[serde(default)]
    pub explorer_api_url: Option<url::Url>,
    #[serde(default)]
    pub explorer_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetcherSettings {
    pub timeout_seconds: u64,
    pub concurrency_per_origin: usize,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            concurrency_per_origin: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    pub idle_ttl_seconds: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct VerifierConfig {
    pub lambda_compiler: LambdaCompilerSettings,
    pub repository_v1: RepositoryV1Settings,
    pub ipfs: IpfsSettings,
    pub fetcher: FetcherSettings,
    pub session: SessionSettings,
    pub chains: HashMap<String, ChainSettings>,
}

impl VerifierConfig {
    const ENV_PREFIX: &'static str = "VERIFIER";

    /// Layers built-in defaults, an optional `config_path` TOML file, and
    /// `VERIFIER__`-prefixed (double-underscore-nested) environment
    /// variables, the same precedence `blockscout-rs`'s own services use.
    pub fn load(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(Self::ENV_PREFIX).separator("__"),
        );
        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_load_with_no_config_sources() {
        std::env::remove_var("VERIFIER__REPOSITORY_V1__PATH");
        let config = VerifierConfig::load(None).unwrap();
        assert_eq!(config.fetcher.timeout_seconds, 30);
        assert_eq!(config.fetcher.concurrency_per_origin, 8);
        assert!(!config.lambda_compiler.enabled);
    }

    #[test]
    fn environment_variable_overrides_a_default() {
        std::env::set_var("VERIFIER__FETCHER__TIMEOUT_SECONDS", "45");
        let config = VerifierConfig::load(None).unwrap();
        assert_eq!(config.fetcher.timeout_seconds, 45);
        std::env::remove_var("VERIFIER__FETCHER__TIMEOUT_SECONDS");
    }
}
