//! Remote Operations (ROS) over TPKT/COTP.
//!
//! Each TPKT packet carries a COTP header and, for data packets, one
//! BER-encoded ROS APDU. The parser extracts the APDU kind, invoke id and
//! operation or error code; argument and result bytes stay opaque and are
//! handed to the dispatch registry under the configured application
//! context. Only definite-length BER is understood.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::BerError;
pub use parser::{ApduKind, RosApdu, cotp_user_data, parse_apdu};

use crate::dispatch::{ErrorCode, OpCode, ProtocolRegistration, SessionHandle};
use crate::framing::{ByteOrder, FieldWidth, LengthBase, LengthRule, RuleExtractor};

/// TPKT: version byte, reserved byte, 16-bit big-endian total length.
pub fn tpkt_extractor() -> RuleExtractor {
    RuleExtractor::new(vec![LengthRule {
        discriminant: layout::TPKT_VERSION,
        direction: None,
        offset: layout::TPKT_LENGTH_OFFSET,
        width: FieldWidth::Two,
        order: ByteOrder::Big,
        base: LengthBase::WholeMessage,
    }])
}

/// Consumes one BER element; malformed input consumes nothing.
pub fn ber_element(body: &[u8], _session: &SessionHandle<'_>) -> usize {
    reader::element_len(body).unwrap_or(0)
}

const OPERATIONS: [(i32, &str); 9] = [
    (1, "read"),
    (2, "compare"),
    (3, "abandon"),
    (4, "list"),
    (5, "search"),
    (6, "addEntry"),
    (7, "removeEntry"),
    (8, "modifyEntry"),
    (9, "modifyDN"),
];

const ERRORS: [(i32, &str); 8] = [
    (1, "attributeError"),
    (2, "nameError"),
    (3, "serviceError"),
    (4, "referral"),
    (5, "abandoned"),
    (6, "securityError"),
    (7, "abandonFailed"),
    (8, "updateError"),
];

/// Operation table registered for [`layout::DEFAULT_CONTEXT`].
pub fn registration() -> ProtocolRegistration {
    let mut registration = ProtocolRegistration::new("directory-access")
        .operation(OpCode::Bind, "directoryBind", ber_element, ber_element)
        .operation(OpCode::Unbind, "directoryUnbind", ber_element, ber_element)
        .error(ErrorCode::Bind, "directoryBindError", ber_element);
    for (code, name) in OPERATIONS {
        registration = registration.operation(OpCode::Local(code), name, ber_element, ber_element);
    }
    for (code, name) in ERRORS {
        registration = registration.error(ErrorCode::Local(code), name, ber_element);
    }
    registration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{MessageKind, RegistryBuilder};
    use crate::framing::{DirectionHint, LengthExtractor, PduLength};

    #[test]
    fn tpkt_length_counts_whole_packet() {
        let length = tpkt_extractor()
            .pdu_length(&[0x03, 0x00, 0x00, 0x10], DirectionHint::ClientToServer)
            .unwrap();
        let PduLength::Framed(boundary) = length else {
            panic!("expected framed TPKT");
        };
        assert_eq!(boundary.header_len, layout::TPKT_HEADER_LEN);
        assert_eq!(boundary.total_len(), 16);
    }

    #[test]
    fn demo_table_registers_cleanly() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(layout::DEFAULT_CONTEXT, registration())
            .unwrap();
        let registry = builder.build();
        assert_eq!(
            registry.name(layout::DEFAULT_CONTEXT, 5, MessageKind::InvokeArgument),
            Some("search")
        );
        assert_eq!(
            registry.name(layout::DEFAULT_CONTEXT, 0, MessageKind::BindInvoke),
            Some("directoryBind")
        );
        assert_eq!(
            registry.name(layout::DEFAULT_CONTEXT, 2, MessageKind::Error),
            Some("nameError")
        );
        assert!(registry
            .resolve(layout::DEFAULT_CONTEXT, 10, MessageKind::InvokeArgument)
            .is_none());
    }
}
