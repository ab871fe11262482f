//! Dispatch Registry: maps a protocol identifier, operation selector and
//! message kind to a decoder.
//!
//! Protocol modules register with a [`RegistryBuilder`] before analysis.
//! `build` freezes the tables into a [`Registry`] that is only ever read,
//! and the [`Dispatcher`] drives decoders over PDU bodies with a generic and
//! then a structural fallback.

pub mod dispatcher;
pub mod error;
pub mod registry;

pub use dispatcher::{DispatchOutcome, Dispatcher, Resolution};
pub use error::RegistryError;
pub use registry::{
    Decoder, ErrorCode, MessageKind, OpCode, Opaque, ProtocolRegistration, Registry,
    RegistryBuilder, SessionHandle,
};
