//! Opaque `compile(version, standardJsonInput) -> standardJsonOutput`
//! capability, backed by either a local svm-managed `solc` or a remote
//! compile function reached over an injected transport.

mod artifacts;
mod driver;
mod error;
mod local;
mod remote;

pub use artifacts::extract_compiled_artifacts;
pub use driver::CompilerDriver;
pub use error::CompilerDriverError;
pub use local::LocalCompilerDriver;
pub use remote::RemoteCompilerDriver;
