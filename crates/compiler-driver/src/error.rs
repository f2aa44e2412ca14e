use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompilerDriverError {
    #[error("compiler version {version} is not installable")]
    CompilerUnavailable { version: String },
    #[error("compilation produced no artifact for the target contract: {message}")]
    CompilerError { message: String },
    #[error("{version} is not a valid compiler semver")]
    InvalidVersion { version: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("remote compile call failed: {0}")]
    Transport(String),
}
