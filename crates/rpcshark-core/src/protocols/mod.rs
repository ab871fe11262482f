//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: byte offsets, tags and constants (source of truth)
//! - `reader`: safe byte access and encoding conventions
//! - `parser`: message envelopes (no direct byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O. They only identify a message: its
//! kind, invocation id and operation code, plus the span of bytes handed to
//! the dispatch registry.

pub mod ros;
pub mod wow;

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::correlation::InvocationId;
use crate::dispatch::{MessageKind, RegistryBuilder, RegistryError};
use crate::framing::{DirectionHint, Pdu};

/// Registry builder holding the built-in protocol tables. Callers may add
/// their own registrations before building.
pub fn builtin_registry() -> Result<RegistryBuilder, RegistryError> {
    let mut builder = RegistryBuilder::new();
    builder.register(ros::layout::DEFAULT_CONTEXT, ros::registration())?;
    builder.register(wow::layout::PROTOCOL_ID, wow::registration())?;
    Ok(builder)
}

/// Protocol bound to a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// ROS APDUs in TPKT/COTP over TCP.
    RosTpkt,
    /// One ROS APDU per UDP datagram.
    RosDatagram,
    Wow,
}

impl ProtocolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolKind::RosTpkt | ProtocolKind::RosDatagram => "ros",
            ProtocolKind::Wow => "wow",
        }
    }

    /// Whether messages carry invocation ids worth correlating.
    pub fn is_rpc(self) -> bool {
        matches!(self, ProtocolKind::RosTpkt | ProtocolKind::RosDatagram)
    }

    pub fn parse(self, pdu: &Pdu) -> Result<Message, ProtocolError> {
        match self {
            ProtocolKind::RosTpkt => parse_tpkt(pdu),
            ProtocolKind::RosDatagram => {
                let apdu = ros::parse_apdu(&pdu.bytes)?;
                Ok(ros_message(apdu, 0))
            }
            ProtocolKind::Wow => {
                let message = wow::parse_message(pdu)?;
                let kind = match pdu.boundary.direction {
                    DirectionHint::ServerToClient => MessageKind::Result,
                    DirectionHint::ClientToServer | DirectionHint::Unknown => {
                        MessageKind::InvokeArgument
                    }
                };
                Ok(Message {
                    name: wow::command_name(message.command).unwrap_or("unknown command"),
                    role: Role::Other,
                    dispatch: Some((kind, i32::from(message.command))),
                    invoke_id: None,
                    body: message.body,
                })
            }
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part a message plays in an invoke/result exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Invoke,
    Result,
    Other,
}

/// Protocol envelope of one PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub name: &'static str,
    pub role: Role,
    /// Message kind and selector to resolve a decoder with; `None` for
    /// messages with nothing to decode.
    pub dispatch: Option<(MessageKind, i32)>,
    pub invoke_id: Option<InvocationId>,
    /// Bytes for the decoder, relative to the PDU.
    pub body: Range<usize>,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("not a TPKT packet (first byte 0x{first:02x})")]
    NotTpkt { first: u8 },
    #[error(transparent)]
    Ber(#[from] ros::BerError),
    #[error(transparent)]
    Wow(#[from] wow::WowError),
}

fn parse_tpkt(pdu: &Pdu) -> Result<Message, ProtocolError> {
    if pdu.boundary.header_len != ros::layout::TPKT_HEADER_LEN {
        let first = pdu.bytes.first().copied().unwrap_or_default();
        return Err(ProtocolError::NotTpkt { first });
    }
    let body = pdu.body();
    let Some(user_data) = ros::cotp_user_data(body)? else {
        return Ok(Message {
            name: "cotp",
            role: Role::Other,
            dispatch: None,
            invoke_id: None,
            body: pdu.bytes.len()..pdu.bytes.len(),
        });
    };
    let apdu = ros::parse_apdu(&body[user_data.clone()])?;
    Ok(ros_message(apdu, pdu.boundary.header_len + user_data.start))
}

fn ros_message(apdu: ros::RosApdu, offset: usize) -> Message {
    use ros::ApduKind;

    let (role, kind) = match apdu.kind {
        ApduKind::Invoke => (Role::Invoke, Some(MessageKind::InvokeArgument)),
        ApduKind::ReturnResult => (Role::Result, Some(MessageKind::Result)),
        ApduKind::ReturnError => (Role::Result, Some(MessageKind::Error)),
        ApduKind::Reject => (Role::Other, None),
        ApduKind::BindInvoke => (Role::Other, Some(MessageKind::BindInvoke)),
        ApduKind::BindResult => (Role::Other, Some(MessageKind::BindResult)),
        ApduKind::BindError => (Role::Other, Some(MessageKind::BindError)),
        ApduKind::UnbindInvoke => (Role::Other, Some(MessageKind::UnbindInvoke)),
        ApduKind::UnbindResult => (Role::Other, Some(MessageKind::UnbindResult)),
        ApduKind::UnbindError => (Role::Other, Some(MessageKind::UnbindError)),
    };
    let dispatch = match (kind, apdu.code) {
        (Some(kind), Some(code)) => Some((kind, code)),
        // bind and unbind have no code of their own
        (Some(kind), None) if role == Role::Other => Some((kind, 0)),
        _ => None,
    };
    Message {
        name: apdu.kind.as_str(),
        role,
        dispatch,
        // invoke ids are compared by their two's complement bits
        invoke_id: apdu.invoke_id.map(|id| id as u32),
        body: (apdu.payload.start + offset)..(apdu.payload.end + offset),
    }
}
