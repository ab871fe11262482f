//! Frame Assembler: recovers complete PDUs from a chunked byte stream.
//!
//! The assembler never decodes a PDU speculatively. Bytes that cannot yet be
//! framed stay in the caller-owned [`StreamBuffer`] until the next segment
//! arrives; at end of stream they are handed back as a trailing block.
//!
//! - `length`: extractor contract and the table-driven [`RuleExtractor`]
//! - `assembler`: per-direction buffering and PDU emission
//! - `error`: length extraction outcomes that are not a length

pub mod assembler;
pub mod error;
pub mod length;

pub use assembler::{Assembly, MalformedBlock, MalformedReason, Pdu, StreamBuffer};
pub use error::LengthError;
pub use length::{
    ByteOrder, Datagram, DirectionHint, FieldWidth, LengthBase, LengthExtractor, LengthRule,
    PduBoundary, PduLength, RuleExtractor,
};
