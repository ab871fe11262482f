use std::ops::Range;

use super::error::WowError;
use super::layout;
use crate::framing::Pdu;

/// Command byte and the span after the size field (or after the command
/// byte for messages without one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WowMessage {
    pub command: u8,
    pub body: Range<usize>,
}

pub fn parse_message(pdu: &Pdu) -> Result<WowMessage, WowError> {
    let command = pdu
        .bytes
        .get(layout::COMMAND_OFFSET)
        .copied()
        .ok_or(WowError::TooShort {
            needed: layout::COMMAND_LEN,
            actual: 0,
        })?;
    let start = pdu.boundary.header_len.max(layout::COMMAND_LEN);
    Ok(WowMessage {
        command,
        body: start..pdu.bytes.len(),
    })
}

pub fn command_name(command: u8) -> Option<&'static str> {
    layout::COMMANDS
        .iter()
        .find(|(code, _)| *code == command)
        .map(|(_, name)| *name)
}
