use thiserror::Error;

/// Errors returned by transport slicing.
///
/// # Examples
/// ```
/// use rpcshark_core::transport::TransportError;
///
/// let err = TransportError::MissingNetworkLayer;
/// assert!(err.to_string().contains("missing network layer"));
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("packet slice error: {0}")]
    Slice(String),
    #[error("missing network layer in packet")]
    MissingNetworkLayer,
    #[error("missing IP payload in packet")]
    MissingIpPayload,
    #[error("segment too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("invalid TCP data offset: {words} words")]
    InvalidDataOffset { words: u8 },
}
