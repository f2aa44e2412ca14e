use thiserror::Error;
use verifier_types::SessionError;

#[derive(Debug, Error)]
pub enum StagerError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("no staged contract with id {0}")]
    UnknownContract(String),
}
