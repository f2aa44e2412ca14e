//! Drives one `(contract, chainId, address)` verification attempt:
//! single-flight gated, compiles the contract, delegates to the bytecode
//! matcher, and offers the extra-file-input-bug retry the matcher's
//! classification can call for.

mod coordinator;
mod error;
mod rpc;
mod standard_json;

pub use coordinator::VerificationCoordinator;
pub use error::CoordinatorError;
pub use rpc::{ChainRegistry, RpcClient, RpcError};
