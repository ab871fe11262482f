//! Packet sources.
//!
//! A source yields raw link-layer frames in capture order. Frame numbers are
//! assigned here, starting at 1, so every later stage can use 0 as an
//! "unset" marker.

mod pcap;

pub use pcap::PcapFileSource;

use pcap_parser::Linktype;
use thiserror::Error;

use crate::FrameNumber;

/// One captured frame.
#[derive(Debug, Clone)]
pub struct PacketEvent {
    /// Capture-order frame number (1-based, strictly increasing).
    pub frame: FrameNumber,
    /// Capture timestamp in seconds since the Unix epoch, when recorded.
    pub ts: Option<f64>,
    pub linktype: Linktype,
    pub data: Vec<u8>,
}

pub trait PacketSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
    #[error("capture holds more than {max} frames", max = FrameNumber::MAX)]
    TooManyFrames,
}

impl From<pcap::error::PcapSourceError> for SourceError {
    fn from(value: pcap::error::PcapSourceError) -> Self {
        match value {
            pcap::error::PcapSourceError::Io(err) => SourceError::Io(err),
            pcap::error::PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
            pcap::error::PcapSourceError::FrameOverflow => SourceError::TooManyFrames,
        }
    }
}
