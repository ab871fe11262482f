/// Leading bytes of a PCAPNG section header block.
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

/// Read buffer handed to the `pcap-parser` readers.
pub const PCAP_READER_BUFFER_SIZE: usize = 64 * 1024;

/// Legacy PCAP sub-second field resolution (microseconds).
pub const LEGACY_TS_RESOLUTION: f64 = 1e-6;

/// Default PCAPNG timestamp resolution (`if_tsresol` absent).
pub const PCAPNG_TS_RESOLUTION: f64 = 1e-6;
