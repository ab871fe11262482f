//! World of Warcraft authentication server protocol.
//!
//! Only two commands carry a size field: the realm list sent by the server
//! and the logon challenge sent by the client. Every other command is
//! exactly one TCP segment. Message contents are not decoded.

pub mod error;
pub mod layout;
pub mod parser;

pub use error::WowError;
pub use parser::{WowMessage, command_name, parse_message};

use crate::dispatch::{OpCode, Opaque, ProtocolRegistration};
use crate::framing::{ByteOrder, DirectionHint, FieldWidth, LengthBase, LengthRule, RuleExtractor};

pub fn length_extractor() -> RuleExtractor {
    let size_field = |command, direction, offset| LengthRule {
        discriminant: command,
        direction: Some(direction),
        offset,
        width: FieldWidth::Two,
        order: ByteOrder::Little,
        base: LengthBase::AfterField,
    };
    RuleExtractor::new(vec![
        size_field(
            layout::CMD_REALM_LIST,
            DirectionHint::ServerToClient,
            layout::REALM_LIST_SIZE_OFFSET,
        ),
        size_field(
            layout::CMD_AUTH_LOGON_CHALLENGE,
            DirectionHint::ClientToServer,
            layout::LOGON_CHALLENGE_SIZE_OFFSET,
        ),
    ])
}

/// Command names with opaque decoders.
pub fn registration() -> ProtocolRegistration {
    layout::COMMANDS
        .iter()
        .fold(ProtocolRegistration::new("wow"), |registration, &(code, name)| {
            registration.operation(OpCode::Local(i32::from(code)), name, Opaque, Opaque)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{LengthExtractor, PduLength, StreamBuffer};

    #[test]
    fn realm_list_is_framed_only_from_server() {
        let extractor = length_extractor();
        let header = [0x10, 0x05, 0x00];
        let PduLength::Framed(boundary) = extractor
            .pdu_length(&header, DirectionHint::ServerToClient)
            .unwrap()
        else {
            panic!("expected framed realm list");
        };
        assert_eq!(boundary.total_len(), 5 + 3);
        assert_eq!(
            extractor
                .pdu_length(&header, DirectionHint::ClientToServer)
                .unwrap(),
            PduLength::Unframed
        );
    }

    #[test]
    fn logon_challenge_spans_segments() {
        let extractor = length_extractor();
        let mut buffer = StreamBuffer::new();
        let first = buffer.push_segment(
            &[0x00, 0x03, 0x04, 0x00, 0x01],
            1,
            DirectionHint::ClientToServer,
            &extractor,
        );
        assert!(first.pdus.is_empty());
        let second = buffer.push_segment(&[0x02, 0x03, 0x04], 2, DirectionHint::ClientToServer, &extractor);
        assert_eq!(second.pdus.len(), 1);
        assert_eq!(second.pdus[0].bytes.len(), 8);
        assert_eq!(second.pdus[0].body(), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn registration_names_every_command() {
        let mut builder = crate::dispatch::RegistryBuilder::new();
        builder.register(layout::PROTOCOL_ID, registration()).unwrap();
        let registry = builder.build();
        for (code, name) in layout::COMMANDS {
            assert_eq!(
                registry.name(
                    layout::PROTOCOL_ID,
                    i32::from(code),
                    crate::dispatch::MessageKind::Result
                ),
                Some(name)
            );
        }
    }
}
