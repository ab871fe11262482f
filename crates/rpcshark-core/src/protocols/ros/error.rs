use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BerError {
    #[error("element too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("indefinite length encoding is not supported")]
    IndefiniteLength,
    #[error("length uses {octets} octets, at most 4 are supported")]
    LengthTooLong { octets: usize },
    #[error("high tag numbers are not supported")]
    HighTagNumber,
    #[error("unexpected tag 0x{found:02x}, expected {expected}")]
    UnexpectedTag { found: u8, expected: &'static str },
    #[error("integer of {len} octets is not supported")]
    IntegerLength { len: usize },
    #[error("integer {value} does not fit 32 bits")]
    IntegerOutOfRange { value: i64 },
    #[error("global (OID) operation codes are not supported")]
    GlobalCode,
    #[error("unknown ROS PDU tag 0x{tag:02x}")]
    UnknownApdu { tag: u8 },
    #[error("COTP header length {li} exceeds the {actual}-byte TPKT body")]
    CotpHeader { li: usize, actual: usize },
}
