//! Transport-layer slicing and in-order segment delivery.
//!
//! `parser` turns a link-layer frame into a TCP or UDP segment with its
//! endpoints; `ordering` restores per-direction byte order for TCP so the
//! frame assembler only ever sees a contiguous stream.

pub mod error;
pub mod layout;
pub mod ordering;
pub mod parser;
pub mod reader;

pub use error::TransportError;
pub use ordering::{DeliveredSegment, LateBytes, SegmentOrdering};
pub use parser::{Segment, TcpFlags, parse_segment};

use serde::{Deserialize, Serialize};

/// Transport protocol of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
