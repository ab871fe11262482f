use thiserror::Error;

use super::registry::{ErrorCode, OpCode};

/// Registration mistakes. A built registry never changes, so these can only
/// happen while protocol modules register themselves.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("protocol {protocol} is already registered")]
    DuplicateProtocol { protocol: String },
    #[error("protocol {protocol} registers operation {code} twice")]
    DuplicateOperation { protocol: String, code: OpCode },
    #[error("protocol {protocol} registers error {code} twice")]
    DuplicateError { protocol: String, code: ErrorCode },
    #[error("a generic decoder for {protocol} is already registered")]
    DuplicateGeneric { protocol: String },
}
