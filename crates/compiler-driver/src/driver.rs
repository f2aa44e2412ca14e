use crate::error::CompilerDriverError;
use async_trait::async_trait;

/// `compile(version, standardJsonInput) -> standardJsonOutput`, stateless
/// from the caller's perspective — nothing about a driver call depends on
/// any previous one. `version` is the exact semver string declared by the
/// contract's metadata; resolving a binary for it is the driver's job, not
/// the caller's. Local (svm-managed solc) and remote (a compile function
/// behind HTTP/gRPC) implementations are interchangeable.
#[async_trait]
pub trait CompilerDriver: Send + Sync {
    async fn compile(
        &self,
        version: &str,
        standard_json_input: &serde_json::Value,
    ) -> Result<serde_json::Value, CompilerDriverError>;
}
