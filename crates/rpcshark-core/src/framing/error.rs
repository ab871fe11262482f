use thiserror::Error;

/// Why a PDU length could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LengthError {
    /// The header is not fully buffered yet; retry with more bytes.
    #[error("insufficient data: need {needed} header bytes")]
    InsufficientData { needed: usize },
    /// The declared length cannot cover its own header.
    #[error("declared length {declared} is shorter than the {minimum}-byte header")]
    Invalid { declared: usize, minimum: usize },
}
