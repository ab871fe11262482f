use tracing::{debug, trace};

use super::error::LengthError;
use super::length::{DirectionHint, LengthExtractor, PduBoundary, PduLength};
use crate::FrameNumber;

/// One complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    /// Frame whose segment completed the PDU.
    pub frame: FrameNumber,
    pub boundary: PduBoundary,
    pub bytes: Vec<u8>,
}

impl Pdu {
    pub fn header(&self) -> &[u8] {
        &self.bytes[..self.boundary.header_len]
    }

    pub fn body(&self) -> &[u8] {
        &self.bytes[self.boundary.header_len..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// A length field declared fewer bytes than its own header.
    InvalidLength { declared: usize, minimum: usize },
    /// The stream ended before the PDU was complete.
    Truncated,
}

/// Bytes released without being framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedBlock {
    pub frame: FrameNumber,
    pub len: usize,
    pub reason: MalformedReason,
}

/// PDUs completed by one segment, in stream order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Assembly {
    pub pdus: Vec<Pdu>,
    pub malformed: Option<MalformedBlock>,
}

/// Caller-owned buffer for one stream direction.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    pending: Vec<u8>,
    last_frame: FrameNumber,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes waiting for the rest of their PDU.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Append one transport segment and return every PDU it completes.
    pub fn push_segment<E>(
        &mut self,
        segment: &[u8],
        frame: FrameNumber,
        hint: DirectionHint,
        extractor: &E,
    ) -> Assembly
    where
        E: LengthExtractor + ?Sized,
    {
        let mut assembly = Assembly::default();
        if segment.is_empty() {
            return assembly;
        }

        // Messages without a length field never span segments.
        if self.pending.is_empty()
            && matches!(
                extractor.pdu_length(segment, hint),
                Ok(PduLength::Unframed)
            )
        {
            assembly.pdus.push(unframed(segment, frame, hint));
            return assembly;
        }

        self.pending.extend_from_slice(segment);
        self.last_frame = frame;

        let mut cursor = 0;
        while cursor < self.pending.len() {
            let rest = &self.pending[cursor..];
            match extractor.pdu_length(rest, hint) {
                Ok(PduLength::Framed(boundary)) => {
                    let total = boundary.total_len();
                    if rest.len() < total {
                        trace!(frame, have = rest.len(), need = total, "waiting for PDU bytes");
                        break;
                    }
                    assembly.pdus.push(Pdu {
                        frame,
                        boundary,
                        bytes: rest[..total].to_vec(),
                    });
                    cursor += total;
                }
                Ok(PduLength::Unframed) => {
                    assembly.pdus.push(unframed(rest, frame, hint));
                    cursor = self.pending.len();
                }
                Err(LengthError::InsufficientData { needed }) => {
                    trace!(frame, have = rest.len(), needed, "waiting for header bytes");
                    break;
                }
                Err(LengthError::Invalid { declared, minimum }) => {
                    debug!(frame, declared, minimum, "invalid length field, resynchronizing");
                    assembly.malformed = Some(MalformedBlock {
                        frame,
                        len: rest.len(),
                        reason: MalformedReason::InvalidLength { declared, minimum },
                    });
                    cursor = self.pending.len();
                }
            }
        }

        self.pending.drain(..cursor);
        assembly
    }

    /// End of stream: release whatever never became a complete PDU.
    pub fn finish(&mut self) -> Option<MalformedBlock> {
        if self.pending.is_empty() {
            return None;
        }
        let block = MalformedBlock {
            frame: self.last_frame,
            len: self.pending.len(),
            reason: MalformedReason::Truncated,
        };
        self.pending.clear();
        Some(block)
    }
}

fn unframed(bytes: &[u8], frame: FrameNumber, hint: DirectionHint) -> Pdu {
    Pdu {
        frame,
        boundary: PduBoundary {
            header_len: 0,
            body_len: bytes.len(),
            direction: hint,
        },
        bytes: bytes.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::length::{ByteOrder, FieldWidth, LengthBase, LengthRule, RuleExtractor};

    /// `0x01 len body..` is framed, everything else is unframed.
    fn extractor() -> RuleExtractor {
        RuleExtractor::new(vec![LengthRule {
            discriminant: 0x01,
            direction: None,
            offset: 1,
            width: FieldWidth::One,
            order: ByteOrder::Big,
            base: LengthBase::AfterField,
        }])
    }

    fn push(buffer: &mut StreamBuffer, bytes: &[u8], frame: FrameNumber) -> Assembly {
        buffer.push_segment(bytes, frame, DirectionHint::ClientToServer, &extractor())
    }

    #[test]
    fn complete_pdu_in_one_segment() {
        let mut buffer = StreamBuffer::new();
        let assembly = push(&mut buffer, &[0x01, 0x02, 0xaa, 0xbb], 1);
        assert_eq!(assembly.pdus.len(), 1);
        assert_eq!(assembly.pdus[0].header(), &[0x01, 0x02]);
        assert_eq!(assembly.pdus[0].body(), &[0xaa, 0xbb]);
        assert_eq!(buffer.buffered(), 0);
    }

    #[test]
    fn pdu_spanning_segments_is_emitted_once_complete() {
        let mut buffer = StreamBuffer::new();
        assert!(push(&mut buffer, &[0x01], 1).pdus.is_empty());
        assert!(push(&mut buffer, &[0x03, 0xaa], 2).pdus.is_empty());
        assert_eq!(buffer.buffered(), 3);
        let assembly = push(&mut buffer, &[0xbb, 0xcc], 3);
        assert_eq!(assembly.pdus.len(), 1);
        assert_eq!(assembly.pdus[0].frame, 3);
        assert_eq!(assembly.pdus[0].body(), &[0xaa, 0xbb, 0xcc]);
    }

    #[test]
    fn several_pdus_in_one_segment_keep_order() {
        let mut buffer = StreamBuffer::new();
        let assembly = push(&mut buffer, &[0x01, 0x01, 0x0a, 0x01, 0x00, 0x01, 0x01], 1);
        let bodies: Vec<&[u8]> = assembly.pdus.iter().map(Pdu::body).collect();
        assert_eq!(bodies, vec![&[0x0a][..], &[][..]]);
        assert_eq!(buffer.buffered(), 2);
    }

    #[test]
    fn unframed_message_is_the_whole_segment() {
        let mut buffer = StreamBuffer::new();
        let assembly = push(&mut buffer, &[0x05, 0x01, 0x09, 0x09], 1);
        assert_eq!(assembly.pdus.len(), 1);
        assert_eq!(assembly.pdus[0].boundary.header_len, 0);
        assert_eq!(assembly.pdus[0].bytes.len(), 4);
        assert_eq!(buffer.buffered(), 0);
    }

    #[test]
    fn unframed_tail_after_framed_pdu() {
        let mut buffer = StreamBuffer::new();
        let assembly = push(&mut buffer, &[0x01, 0x00, 0x07, 0x07], 1);
        assert_eq!(assembly.pdus.len(), 2);
        assert_eq!(assembly.pdus[1].bytes, vec![0x07, 0x07]);
    }

    #[test]
    fn invalid_length_releases_buffer() {
        let tpkt = RuleExtractor::new(vec![LengthRule {
            discriminant: 0x03,
            direction: None,
            offset: 2,
            width: FieldWidth::Two,
            order: ByteOrder::Big,
            base: LengthBase::WholeMessage,
        }]);
        let mut buffer = StreamBuffer::new();
        let assembly =
            buffer.push_segment(&[0x03, 0x00, 0x00, 0x01, 0xff], 7, DirectionHint::Unknown, &tpkt);
        assert!(assembly.pdus.is_empty());
        assert_eq!(
            assembly.malformed,
            Some(MalformedBlock {
                frame: 7,
                len: 5,
                reason: MalformedReason::InvalidLength {
                    declared: 1,
                    minimum: 4
                },
            })
        );
        assert_eq!(buffer.buffered(), 0);
    }

    #[test]
    fn finish_reports_truncated_pdu() {
        let mut buffer = StreamBuffer::new();
        push(&mut buffer, &[0x01, 0x09, 0x00], 4);
        let block = buffer.finish().unwrap();
        assert_eq!(block.frame, 4);
        assert_eq!(block.len, 3);
        assert_eq!(block.reason, MalformedReason::Truncated);
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn empty_segment_is_ignored() {
        let mut buffer = StreamBuffer::new();
        assert_eq!(push(&mut buffer, &[], 1), Assembly::default());
    }
}
