pub const UDP_HEADER_LEN: usize = 8;

pub const TCP_MIN_HEADER_LEN: usize = 20;
pub const TCP_DATA_OFFSET_INDEX: usize = 12;
/// Data offset is counted in 32-bit words.
pub const TCP_DATA_OFFSET_UNIT: usize = 4;
