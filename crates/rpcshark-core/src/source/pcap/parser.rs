use std::fs::File;
use std::path::Path;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader,
    traits::PcapReaderIterator,
};

use crate::source::{PacketEvent, PacketSource, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    FrameCounter, is_pcapng_magic, legacy_ts_to_seconds, linktype_for_interface,
    pcapng_ts_to_seconds, read_magic_and_rewind,
};

/// Packet source reading a PCAP or PCAPNG file from disk.
pub struct PcapFileSource {
    inner: PcapReader,
    frames: FrameCounter,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
    },
    Ng {
        reader: PcapNGReader<File>,
        linktypes: Vec<Linktype>,
    },
}

/// A packet block stripped of its container format.
struct RawPacket {
    ts: f64,
    linktype: Linktype,
    data: Vec<u8>,
}

impl PcapFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::from)?;
        let inner = create_reader(file).map_err(SourceError::from)?;
        Ok(Self {
            inner,
            frames: FrameCounter::default(),
        })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        let Some(raw) = next_raw_packet(&mut self.inner)? else {
            return Ok(None);
        };
        let frame = self.frames.next_frame()?;
        Ok(Some(PacketEvent {
            frame,
            ts: Some(raw.ts),
            linktype: raw.linktype,
            data: raw.data,
        }))
    }
}

fn create_reader(file: File) -> Result<PcapReader, PcapSourceError> {
    let mut file = file;
    let magic = read_magic_and_rewind(&mut file)?;

    if is_pcapng_magic(&magic) {
        let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
            .map_err(|e| pcap_error("pcapng reader init", e))?;
        Ok(PcapReader::Ng {
            reader,
            linktypes: Vec::new(),
        })
    } else {
        let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
            .map_err(|e| pcap_error("pcap reader init", e))?;
        Ok(PcapReader::Legacy {
            reader,
            linktype: None,
        })
    }
}

fn next_raw_packet(reader: &mut PcapReader) -> Result<Option<RawPacket>, PcapSourceError> {
    loop {
        let step = match reader {
            PcapReader::Legacy { reader, linktype } => match reader.next() {
                Ok((offset, block)) => {
                    let packet = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            *linktype = Some(header.network);
                            None
                        }
                        PcapBlockOwned::Legacy(packet) => Some(RawPacket {
                            ts: legacy_ts_to_seconds(packet.ts_sec, packet.ts_usec),
                            linktype: linktype.unwrap_or(Linktype::ETHERNET),
                            data: packet.data.to_vec(),
                        }),
                        _ => None,
                    };
                    reader.consume(offset);
                    Ok(packet)
                }
                Err(PcapError::Incomplete(_)) => reader
                    .refill()
                    .map(|()| None)
                    .map_err(|e| pcap_error("pcap reader refill", e)),
                Err(PcapError::Eof) => return Ok(None),
                Err(e) => Err(pcap_error("pcap reader next", e)),
            },
            PcapReader::Ng { reader, linktypes } => match reader.next() {
                Ok((offset, block)) => {
                    let packet = match block {
                        PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                            linktypes.push(intf.linktype);
                            None
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => Some(RawPacket {
                            ts: pcapng_ts_to_seconds(packet.ts_high, packet.ts_low),
                            linktype: linktype_for_interface(linktypes, packet.if_id),
                            data: packet.data.to_vec(),
                        }),
                        _ => None,
                    };
                    reader.consume(offset);
                    Ok(packet)
                }
                Err(PcapError::Incomplete(_)) => reader
                    .refill()
                    .map(|()| None)
                    .map_err(|e| pcap_error("pcapng reader refill", e)),
                Err(PcapError::Eof) => return Ok(None),
                Err(e) => Err(pcap_error("pcapng reader next", e)),
            },
        };
        if let Some(packet) = step? {
            return Ok(Some(packet));
        }
    }
}

fn pcap_error(context: &'static str, err: impl ToString) -> PcapSourceError {
    PcapSourceError::Pcap {
        context,
        message: err.to_string(),
    }
}
