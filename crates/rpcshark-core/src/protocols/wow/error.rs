use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WowError {
    #[error("message too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
}
