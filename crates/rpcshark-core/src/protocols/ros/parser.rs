use std::ops::Range;

use super::error::BerError;
use super::layout;
use super::reader::BerReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApduKind {
    Invoke,
    ReturnResult,
    ReturnError,
    Reject,
    BindInvoke,
    BindResult,
    BindError,
    UnbindInvoke,
    UnbindResult,
    UnbindError,
}

impl ApduKind {
    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            layout::TAG_INVOKE => ApduKind::Invoke,
            layout::TAG_RETURN_RESULT => ApduKind::ReturnResult,
            layout::TAG_RETURN_ERROR => ApduKind::ReturnError,
            layout::TAG_REJECT => ApduKind::Reject,
            layout::TAG_BIND_INVOKE => ApduKind::BindInvoke,
            layout::TAG_BIND_RESULT => ApduKind::BindResult,
            layout::TAG_BIND_ERROR => ApduKind::BindError,
            layout::TAG_UNBIND_INVOKE => ApduKind::UnbindInvoke,
            layout::TAG_UNBIND_RESULT => ApduKind::UnbindResult,
            layout::TAG_UNBIND_ERROR => ApduKind::UnbindError,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApduKind::Invoke => "invoke",
            ApduKind::ReturnResult => "returnResult",
            ApduKind::ReturnError => "returnError",
            ApduKind::Reject => "reject",
            ApduKind::BindInvoke => "bind-invoke",
            ApduKind::BindResult => "bind-result",
            ApduKind::BindError => "bind-error",
            ApduKind::UnbindInvoke => "unbind-invoke",
            ApduKind::UnbindResult => "unbind-result",
            ApduKind::UnbindError => "unbind-error",
        }
    }
}

/// Envelope of one ROS APDU. `payload` is the argument, result or error
/// parameter span, relative to the slice handed to [`parse_apdu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosApdu {
    pub kind: ApduKind,
    pub invoke_id: Option<i32>,
    pub code: Option<i32>,
    pub payload: Range<usize>,
}

pub fn parse_apdu(apdu: &[u8]) -> Result<RosApdu, BerError> {
    let mut reader = BerReader::new(apdu);
    let outer = reader.read_tlv()?;
    let kind = ApduKind::from_tag(outer.tag).ok_or(BerError::UnknownApdu { tag: outer.tag })?;
    let mut fields = BerReader::nested(&outer);

    let mut invoke_id = None;
    let mut code = None;
    let payload = match kind {
        ApduKind::Invoke => {
            invoke_id = read_invoke_id(&mut fields)?;
            if matches!(
                fields.peek_tag(),
                Some(layout::TAG_LINKED_PRESENT | layout::TAG_LINKED_ABSENT)
            ) {
                fields.read_tlv()?;
            }
            code = Some(read_code(&mut fields)?);
            fields.offset()..fields.end()
        }
        ApduKind::ReturnResult => {
            invoke_id = read_invoke_id(&mut fields)?;
            if fields.is_empty() {
                fields.offset()..fields.offset()
            } else {
                let result = fields.read_expected(layout::TAG_SEQUENCE, "SEQUENCE")?;
                let mut inner = BerReader::nested(&result);
                code = Some(read_code(&mut inner)?);
                inner.offset()..inner.end()
            }
        }
        ApduKind::ReturnError => {
            invoke_id = read_invoke_id(&mut fields)?;
            code = Some(read_code(&mut fields)?);
            fields.offset()..fields.end()
        }
        ApduKind::Reject => {
            invoke_id = read_invoke_id(&mut fields)?;
            fields.offset()..fields.end()
        }
        ApduKind::BindInvoke
        | ApduKind::BindResult
        | ApduKind::BindError
        | ApduKind::UnbindInvoke
        | ApduKind::UnbindResult
        | ApduKind::UnbindError => outer.contents_range(),
    };

    Ok(RosApdu {
        kind,
        invoke_id,
        code,
        payload,
    })
}

/// The APDU carried by a TPKT body, or `None` for COTP packets other than
/// data (connection requests, confirms, disconnects).
pub fn cotp_user_data(tpkt_body: &[u8]) -> Result<Option<Range<usize>>, BerError> {
    let li = tpkt_body
        .get(layout::COTP_LI_OFFSET)
        .copied()
        .ok_or(BerError::TooShort {
            needed: layout::COTP_DT_HEADER_LEN,
            actual: tpkt_body.len(),
        })?;
    let header_len = usize::from(li) + 1;
    if header_len > tpkt_body.len() || header_len <= layout::COTP_TYPE_OFFSET {
        return Err(BerError::CotpHeader {
            li: usize::from(li),
            actual: tpkt_body.len(),
        });
    }
    let pdu_type = tpkt_body[layout::COTP_TYPE_OFFSET] & layout::COTP_TYPE_MASK;
    if pdu_type != layout::COTP_TYPE_DT {
        return Ok(None);
    }
    Ok(Some(header_len..tpkt_body.len()))
}

fn read_invoke_id(reader: &mut BerReader<'_>) -> Result<Option<i32>, BerError> {
    match reader.peek_tag() {
        Some(layout::TAG_NULL) => {
            reader.read_tlv()?;
            Ok(None)
        }
        _ => {
            let value = reader.read_integer()?;
            i32::try_from(value)
                .map(Some)
                .map_err(|_| BerError::IntegerOutOfRange { value })
        }
    }
}

fn read_code(reader: &mut BerReader<'_>) -> Result<i32, BerError> {
    if reader.peek_tag() == Some(layout::TAG_OID) {
        return Err(BerError::GlobalCode);
    }
    let value = reader.read_integer()?;
    i32::try_from(value).map_err(|_| BerError::IntegerOutOfRange { value })
}
