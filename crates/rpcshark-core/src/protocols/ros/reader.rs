use std::ops::Range;

use super::error::BerError;
use super::layout;

/// One BER element. Offsets are absolute within the buffer the outermost
/// reader was created over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub start: usize,
    pub header_len: usize,
    pub contents: &'a [u8],
}

impl Tlv<'_> {
    pub fn contents_range(&self) -> Range<usize> {
        let begin = self.start + self.header_len;
        begin..begin + self.contents.len()
    }

    pub fn end(&self) -> usize {
        self.start + self.header_len + self.contents.len()
    }
}

/// Cursor over definite-length BER elements.
pub struct BerReader<'a> {
    data: &'a [u8],
    base: usize,
    pos: usize,
}

impl<'a> BerReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            base: 0,
            pos: 0,
        }
    }

    /// Reader over the contents of `tlv`, keeping absolute offsets.
    pub fn nested(tlv: &Tlv<'a>) -> Self {
        Self {
            data: tlv.contents,
            base: tlv.start + tlv.header_len,
            pos: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn end(&self) -> usize {
        self.base + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn require_len(&self, needed: usize) -> Result<(), BerError> {
        let actual = self.data.len() - self.pos;
        if actual < needed {
            return Err(BerError::TooShort { needed, actual });
        }
        Ok(())
    }

    pub fn read_tlv(&mut self) -> Result<Tlv<'a>, BerError> {
        let rest = &self.data[self.pos..];
        let (tag, header_len, len) = read_header(rest)?;
        let total = header_len
            .checked_add(len)
            .ok_or(BerError::LengthTooLong { octets: 8 })?;
        self.require_len(total)?;
        let tlv = Tlv {
            tag,
            start: self.offset(),
            header_len,
            contents: &rest[header_len..total],
        };
        self.pos += total;
        Ok(tlv)
    }

    pub fn read_expected(&mut self, tag: u8, expected: &'static str) -> Result<Tlv<'a>, BerError> {
        let found = self.peek_tag().ok_or(BerError::TooShort {
            needed: 1,
            actual: 0,
        })?;
        if found != tag {
            return Err(BerError::UnexpectedTag { found, expected });
        }
        self.read_tlv()
    }

    pub fn read_integer(&mut self) -> Result<i64, BerError> {
        let tlv = self.read_expected(layout::TAG_INTEGER, "INTEGER")?;
        integer_value(tlv.contents)
    }
}

/// Total encoded size of the element at the start of `data`.
pub fn element_len(data: &[u8]) -> Result<usize, BerError> {
    let (_, header_len, len) = read_header(data)?;
    let total = header_len
        .checked_add(len)
        .ok_or(BerError::LengthTooLong { octets: 8 })?;
    if data.len() < total {
        return Err(BerError::TooShort {
            needed: total,
            actual: data.len(),
        });
    }
    Ok(total)
}

pub fn integer_value(contents: &[u8]) -> Result<i64, BerError> {
    if contents.is_empty() || contents.len() > layout::MAX_INTEGER_OCTETS {
        return Err(BerError::IntegerLength {
            len: contents.len(),
        });
    }
    let mut value: i64 = if contents[0] & 0x80 != 0 { -1 } else { 0 };
    for &byte in contents {
        value = (value << 8) | i64::from(byte);
    }
    Ok(value)
}

/// Tag, header length and declared contents length.
fn read_header(data: &[u8]) -> Result<(u8, usize, usize), BerError> {
    let &tag = data.first().ok_or(BerError::TooShort {
        needed: 2,
        actual: data.len(),
    })?;
    if tag & layout::TAG_HIGH_NUMBER == layout::TAG_HIGH_NUMBER {
        return Err(BerError::HighTagNumber);
    }
    let &first = data.get(1).ok_or(BerError::TooShort {
        needed: 2,
        actual: data.len(),
    })?;
    if first & layout::LENGTH_LONG_FORM == 0 {
        return Ok((tag, 2, usize::from(first)));
    }
    if first == layout::LENGTH_INDEFINITE {
        return Err(BerError::IndefiniteLength);
    }
    let octets = usize::from(first & !layout::LENGTH_LONG_FORM);
    if octets > layout::MAX_LENGTH_OCTETS {
        return Err(BerError::LengthTooLong { octets });
    }
    let header_len = 2 + octets;
    let bytes = data.get(2..header_len).ok_or(BerError::TooShort {
        needed: header_len,
        actual: data.len(),
    })?;
    let len = bytes
        .iter()
        .fold(0usize, |acc, &byte| (acc << 8) | usize::from(byte));
    Ok((tag, header_len, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_form_lengths() {
        let mut reader = BerReader::new(&[0x04, 0x01, 0xaa, 0x04, 0x81, 0x02, 0xbb, 0xcc]);
        let first = reader.read_tlv().unwrap();
        assert_eq!(first.contents, &[0xaa]);
        let second = reader.read_tlv().unwrap();
        assert_eq!(second.start, 3);
        assert_eq!(second.header_len, 3);
        assert_eq!(second.contents_range(), 6..8);
        assert!(reader.is_empty());
    }

    #[test]
    fn nested_reader_keeps_absolute_offsets() {
        let data = [0x30, 0x03, 0x02, 0x01, 0x07];
        let mut outer = BerReader::new(&data);
        let seq = outer.read_tlv().unwrap();
        let mut inner = BerReader::nested(&seq);
        assert_eq!(inner.offset(), 2);
        assert_eq!(inner.read_integer().unwrap(), 7);
        assert_eq!(inner.offset(), 5);
        assert_eq!(inner.end(), 5);
    }

    #[test]
    fn integers_are_twos_complement() {
        assert_eq!(integer_value(&[0x7f]).unwrap(), 127);
        assert_eq!(integer_value(&[0x00, 0x80]).unwrap(), 128);
        assert_eq!(integer_value(&[0xff]).unwrap(), -1);
        assert_eq!(integer_value(&[0xff, 0x7f]).unwrap(), -129);
        assert!(integer_value(&[]).is_err());
    }

    #[test]
    fn truncated_contents_are_rejected() {
        let mut reader = BerReader::new(&[0x02, 0x04, 0x01]);
        assert_eq!(
            reader.read_tlv().unwrap_err(),
            BerError::TooShort {
                needed: 6,
                actual: 3
            }
        );
        assert_eq!(element_len(&[0x02]).unwrap_err(), BerError::TooShort { needed: 2, actual: 1 });
    }

    #[test]
    fn indefinite_and_high_tags_are_rejected() {
        assert_eq!(element_len(&[0x30, 0x80, 0, 0]).unwrap_err(), BerError::IndefiniteLength);
        assert_eq!(element_len(&[0x1f, 0x01, 0]).unwrap_err(), BerError::HighTagNumber);
    }

    #[test]
    fn unexpected_tag_is_reported() {
        let mut reader = BerReader::new(&[0x05, 0x00]);
        assert_eq!(
            reader.read_integer().unwrap_err(),
            BerError::UnexpectedTag {
                found: 0x05,
                expected: "INTEGER"
            }
        );
    }

    #[test]
    fn element_len_covers_header() {
        assert_eq!(element_len(&[0x04, 0x02, 1, 2, 9, 9]).unwrap(), 4);
    }
}
