//! Recompiles, normalizes and compares contract bytecode against on-chain
//! code, classifying the outcome as a perfect, partial or extra-file-input-bug
//! match for both the runtime and creation halves of a deployment.

mod library;
mod matcher;
mod trailer;
mod transformation;

pub use library::{link_libraries, LinkError};
pub use matcher::{build_match, tie_break, BytecodeMatcher, MatchError};
pub use trailer::split_metadata_trailer;
pub use transformation::{MatchValues, Transformation};
