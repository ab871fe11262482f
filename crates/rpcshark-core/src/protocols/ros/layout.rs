pub const TPKT_VERSION: u8 = 0x03;
pub const TPKT_LENGTH_OFFSET: usize = 2;
pub const TPKT_HEADER_LEN: usize = 4;

pub const COTP_LI_OFFSET: usize = 0;
pub const COTP_TYPE_OFFSET: usize = 1;
pub const COTP_TYPE_MASK: u8 = 0xF0;
pub const COTP_TYPE_DT: u8 = 0xF0;
pub const COTP_DT_HEADER_LEN: usize = 3;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_HIGH_NUMBER: u8 = 0x1F;

/// Context-specific `[0]` and `[1]` primitive: the two linkedId forms.
pub const TAG_LINKED_PRESENT: u8 = 0x80;
pub const TAG_LINKED_ABSENT: u8 = 0x81;

/// Context-specific constructed APDU tags.
pub const TAG_INVOKE: u8 = 0xA1;
pub const TAG_RETURN_RESULT: u8 = 0xA2;
pub const TAG_RETURN_ERROR: u8 = 0xA3;
pub const TAG_REJECT: u8 = 0xA4;
pub const TAG_BIND_INVOKE: u8 = 0xB0;
pub const TAG_BIND_RESULT: u8 = 0xB1;
pub const TAG_BIND_ERROR: u8 = 0xB2;
pub const TAG_UNBIND_INVOKE: u8 = 0xB3;
pub const TAG_UNBIND_RESULT: u8 = 0xB4;
pub const TAG_UNBIND_ERROR: u8 = 0xB5;

pub const LENGTH_LONG_FORM: u8 = 0x80;
pub const LENGTH_INDEFINITE: u8 = 0x80;
pub const MAX_LENGTH_OCTETS: usize = 4;
pub const MAX_INTEGER_OCTETS: usize = 8;

pub const DEFAULT_TCP_PORT: u16 = 102;
/// Application context used when none is configured.
pub const DEFAULT_CONTEXT: &str = "2.5.9.1";
