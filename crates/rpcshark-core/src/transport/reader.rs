use super::error::TransportError;
use super::layout;

/// Safe access to the bytes of one transport segment (header included).
pub struct SegmentReader<'a> {
    segment: &'a [u8],
}

impl<'a> SegmentReader<'a> {
    pub fn new(segment: &'a [u8]) -> Self {
        Self { segment }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), TransportError> {
        if self.segment.len() < needed {
            return Err(TransportError::TooShort {
                needed,
                actual: self.segment.len(),
            });
        }
        Ok(())
    }

    fn payload_after(&self, header_len: usize) -> Result<&'a [u8], TransportError> {
        self.require_len(header_len)?;
        self.segment
            .get(header_len..)
            .ok_or(TransportError::TooShort {
                needed: header_len,
                actual: self.segment.len(),
            })
    }

    pub fn udp_payload(&self) -> Result<&'a [u8], TransportError> {
        self.payload_after(layout::UDP_HEADER_LEN)
    }

    /// TCP payload, honouring the data offset field (options included).
    pub fn tcp_payload(&self) -> Result<&'a [u8], TransportError> {
        self.require_len(layout::TCP_MIN_HEADER_LEN)?;
        let words = self.segment[layout::TCP_DATA_OFFSET_INDEX] >> 4;
        let header_len = words as usize * layout::TCP_DATA_OFFSET_UNIT;
        if header_len < layout::TCP_MIN_HEADER_LEN {
            return Err(TransportError::InvalidDataOffset { words });
        }
        self.payload_after(header_len)
    }
}

#[cfg(test)]
mod tests {
    use super::SegmentReader;
    use crate::transport::error::TransportError;

    #[test]
    fn udp_payload_skips_header() {
        let segment = [0u8; 12];
        let reader = SegmentReader::new(&segment);
        assert_eq!(reader.udp_payload().unwrap().len(), 4);
    }

    #[test]
    fn udp_payload_too_short() {
        let segment = [0u8; 7];
        let reader = SegmentReader::new(&segment);
        let err = reader.udp_payload().unwrap_err();
        assert!(matches!(err, TransportError::TooShort { .. }));
    }

    #[test]
    fn tcp_payload_honours_options() {
        let mut segment = [0u8; 30];
        segment[12] = 6 << 4;
        let reader = SegmentReader::new(&segment);
        assert_eq!(reader.tcp_payload().unwrap().len(), 6);
    }

    #[test]
    fn tcp_payload_rejects_short_data_offset() {
        let mut segment = [0u8; 20];
        segment[12] = 4 << 4;
        let reader = SegmentReader::new(&segment);
        let err = reader.tcp_payload().unwrap_err();
        assert!(matches!(err, TransportError::InvalidDataOffset { words: 4 }));
    }
}
