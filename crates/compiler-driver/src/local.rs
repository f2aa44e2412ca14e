use crate::driver::CompilerDriver;
use crate::error::CompilerDriverError;
use async_trait::async_trait;
use ethers_solc::{CompilerInput, Solc};
use std::str::FromStr;

/// Resolves and invokes an svm-managed `solc` binary for the exact semver
/// a contract's metadata declares, installing it on first use. Blocking
/// solc work runs on the blocking pool so callers can await it from async
/// contexts without stalling the runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCompilerDriver;

impl LocalCompilerDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompilerDriver for LocalCompilerDriver {
    async fn compile(
        &self,
        version: &str,
        standard_json_input: &serde_json::Value,
    ) -> Result<serde_json::Value, CompilerDriverError> {
        let version = version.to_string();
        let input: CompilerInput = serde_json::from_value(standard_json_input.clone())?;

        let output = tokio::task::spawn_blocking(move || -> Result<serde_json::Value, CompilerDriverError> {
            let semver = semver::Version::from_str(version.trim_start_matches('v')).map_err(|_| {
                CompilerDriverError::InvalidVersion {
                    version: version.clone(),
                }
            })?;
            let solc = Solc::find_or_install_svm_version(semver.to_string()).map_err(|_| {
                CompilerDriverError::CompilerUnavailable {
                    version: version.clone(),
                }
            })?;

            tracing::info!(version = %version, "invoking local solc");
            let compiled = solc
                .compile_exact(&input)
                .map_err(|err| CompilerDriverError::CompilerError {
                    message: err.to_string(),
                })?;

            let errors: Vec<_> = compiled
                .errors
                .iter()
                .filter(|e| e.severity.is_error())
                .collect();
            if !errors.is_empty() {
                return Err(CompilerDriverError::CompilerError {
                    message: errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"),
                });
            }
            for warning in compiled.errors.iter().filter(|e| !e.severity.is_error()) {
                tracing::warn!(message = %warning, "solc compiler warning");
            }

            serde_json::to_value(&compiled).map_err(CompilerDriverError::from)
        })
        .await
        .map_err(|err| CompilerDriverError::CompilerError {
            message: format!("solc invocation panicked: {err}"),
        })??;

        Ok(output)
    }
}
