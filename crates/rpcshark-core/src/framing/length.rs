//! PDU length extraction.
//!
//! A length extractor looks at the bytes at the current stream position and
//! says how long the next PDU is. Table-driven extraction covers the common
//! case: a leading discriminant byte selects where a 1- or 2-byte length
//! field sits, and message types without a rule are unframed.

use serde::{Deserialize, Serialize};

use super::error::LengthError;

/// Which side of the conversation produced the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionHint {
    ClientToServer,
    ServerToClient,
    Unknown,
}

impl DirectionHint {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectionHint::ClientToServer => "client_to_server",
            DirectionHint::ServerToClient => "server_to_client",
            DirectionHint::Unknown => "unknown",
        }
    }
}

/// Boundary of one PDU: header bytes (up to and including the length field)
/// followed by the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduBoundary {
    pub header_len: usize,
    pub body_len: usize,
    pub direction: DirectionHint,
}

impl PduBoundary {
    pub fn total_len(&self) -> usize {
        self.header_len + self.body_len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduLength {
    /// The message declares its own length.
    Framed(PduBoundary),
    /// The message type has no length field; it ends with the segment.
    Unframed,
}

/// Protocol-supplied length computation.
pub trait LengthExtractor {
    fn pdu_length(&self, header: &[u8], hint: DirectionHint) -> Result<PduLength, LengthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    One,
    Two,
}

impl FieldWidth {
    pub fn len(self) -> usize {
        match self {
            FieldWidth::One => 1,
            FieldWidth::Two => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

/// What the declared length counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthBase {
    /// The whole message, header included.
    WholeMessage,
    /// Only the bytes after the length field.
    AfterField,
}

/// Where one message type keeps its length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRule {
    pub discriminant: u8,
    /// Restrict the rule to one direction; `None` matches both.
    pub direction: Option<DirectionHint>,
    pub offset: usize,
    pub width: FieldWidth,
    pub order: ByteOrder,
    pub base: LengthBase,
}

impl LengthRule {
    fn matches(&self, discriminant: u8, hint: DirectionHint) -> bool {
        self.discriminant == discriminant && self.direction.is_none_or(|dir| dir == hint)
    }

    fn header_len(&self) -> usize {
        self.offset + self.width.len()
    }

    fn read_declared(&self, field: &[u8]) -> usize {
        match (self.width, self.order) {
            (FieldWidth::One, _) => field[0] as usize,
            (FieldWidth::Two, ByteOrder::Big) => u16::from_be_bytes([field[0], field[1]]) as usize,
            (FieldWidth::Two, ByteOrder::Little) => {
                u16::from_le_bytes([field[0], field[1]]) as usize
            }
        }
    }
}

/// Length extractor driven by a list of [`LengthRule`]s (first match wins).
#[derive(Debug, Clone, Default)]
pub struct RuleExtractor {
    rules: Vec<LengthRule>,
}

impl RuleExtractor {
    pub fn new(rules: Vec<LengthRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[LengthRule] {
        &self.rules
    }
}

impl LengthExtractor for RuleExtractor {
    fn pdu_length(&self, header: &[u8], hint: DirectionHint) -> Result<PduLength, LengthError> {
        let &discriminant = header
            .first()
            .ok_or(LengthError::InsufficientData { needed: 1 })?;
        let Some(rule) = self
            .rules
            .iter()
            .find(|rule| rule.matches(discriminant, hint))
        else {
            return Ok(PduLength::Unframed);
        };

        let header_len = rule.header_len();
        let field = header
            .get(rule.offset..header_len)
            .ok_or(LengthError::InsufficientData { needed: header_len })?;
        let declared = rule.read_declared(field);
        let total = match rule.base {
            LengthBase::WholeMessage => declared,
            LengthBase::AfterField => header_len + declared,
        };
        if total < header_len {
            return Err(LengthError::Invalid {
                declared,
                minimum: header_len,
            });
        }

        Ok(PduLength::Framed(PduBoundary {
            header_len,
            body_len: total - header_len,
            direction: hint,
        }))
    }
}

/// Message-oriented transports: every segment is one message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Datagram;

impl LengthExtractor for Datagram {
    fn pdu_length(&self, _header: &[u8], _hint: DirectionHint) -> Result<PduLength, LengthError> {
        Ok(PduLength::Unframed)
    }
}
