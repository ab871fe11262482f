#![allow(dead_code)]

use std::fs;
use std::path::Path;

use etherparse::PacketBuilder;

pub type Endpoint = ([u8; 4], u16);

pub const CLIENT: Endpoint = ([10, 0, 0, 2], 40000);
pub const ROS_SERVER: Endpoint = ([10, 0, 0, 1], 102);
pub const WOW_SERVER: Endpoint = ([10, 0, 0, 1], 3724);

/// Frames with their capture time in microseconds.
#[derive(Default)]
pub struct Capture {
    packets: Vec<(u64, Vec<u8>)>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tcp(&mut self, ts_us: u64, src: Endpoint, dst: Endpoint, seq: u32, payload: &[u8]) -> &mut Self {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4(src.0, dst.0, 64)
            .tcp(src.1, dst.1, seq, 65535)
            .ack(1);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).unwrap();
        self.packets.push((ts_us, frame));
        self
    }

    pub fn udp(&mut self, ts_us: u64, src: Endpoint, dst: Endpoint, payload: &[u8]) -> &mut Self {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4(src.0, dst.0, 64)
            .udp(src.1, dst.1);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).unwrap();
        self.packets.push((ts_us, frame));
        self
    }

    pub fn write_pcapng(&self, path: &Path) {
        let mut output = Vec::new();
        output.extend_from_slice(&pcapng_block(0x0A0D0D0A, &section_header_body()));
        output.extend_from_slice(&pcapng_block(1, &interface_desc_body()));
        for (ts_us, data) in &self.packets {
            output.extend_from_slice(&pcapng_block(6, &enhanced_packet_body(*ts_us, data)));
        }
        fs::write(path, output).unwrap();
    }

    /// Legacy little-endian pcap with microsecond timestamps.
    pub fn write_pcap(&self, path: &Path) {
        let mut output = Vec::new();
        output.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
        output.extend_from_slice(&2u16.to_le_bytes());
        output.extend_from_slice(&4u16.to_le_bytes());
        output.extend_from_slice(&0i32.to_le_bytes());
        output.extend_from_slice(&0u32.to_le_bytes());
        output.extend_from_slice(&65535u32.to_le_bytes());
        output.extend_from_slice(&1u32.to_le_bytes());
        for (ts_us, data) in &self.packets {
            output.extend_from_slice(&((ts_us / 1_000_000) as u32).to_le_bytes());
            output.extend_from_slice(&((ts_us % 1_000_000) as u32).to_le_bytes());
            output.extend_from_slice(&(data.len() as u32).to_le_bytes());
            output.extend_from_slice(&(data.len() as u32).to_le_bytes());
            output.extend_from_slice(data);
        }
        fs::write(path, output).unwrap();
    }
}

/// TPKT + COTP DT around one APDU.
pub fn tpkt(apdu: &[u8]) -> Vec<u8> {
    let total = (4 + 3 + apdu.len()) as u16;
    let mut packet = vec![0x03, 0x00];
    packet.extend_from_slice(&total.to_be_bytes());
    packet.extend_from_slice(&[0x02, 0xf0, 0x80]);
    packet.extend_from_slice(apdu);
    packet
}

fn tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    assert!(contents.len() < 0x80);
    let mut out = vec![tag, contents.len() as u8];
    out.extend_from_slice(contents);
    out
}

fn integer(value: u8) -> Vec<u8> {
    tlv(0x02, &[value])
}

pub fn invoke(invoke_id: u8, opcode: u8, argument: &[u8]) -> Vec<u8> {
    let mut contents = integer(invoke_id);
    contents.extend(integer(opcode));
    contents.extend_from_slice(argument);
    tlv(0xa1, &contents)
}

pub fn return_result(invoke_id: u8, opcode: u8, result: &[u8]) -> Vec<u8> {
    let mut inner = integer(opcode);
    inner.extend_from_slice(result);
    let mut contents = integer(invoke_id);
    contents.extend(tlv(0x30, &inner));
    tlv(0xa2, &contents)
}

pub fn return_error(invoke_id: u8, errcode: u8) -> Vec<u8> {
    let mut contents = integer(invoke_id);
    contents.extend(integer(errcode));
    tlv(0xa3, &contents)
}

/// An OCTET STRING, the opaque argument used throughout.
pub fn octets(bytes: &[u8]) -> Vec<u8> {
    tlv(0x04, bytes)
}

fn pcapng_block(block_type: u32, body: &[u8]) -> Vec<u8> {
    let total_len = (8 + body.len() + 4) as u32;
    let mut block = Vec::with_capacity(total_len as usize);
    block.extend_from_slice(&block_type.to_be_bytes());
    block.extend_from_slice(&total_len.to_be_bytes());
    block.extend_from_slice(body);
    block.extend_from_slice(&total_len.to_be_bytes());
    block
}

fn section_header_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0x1A2B3C4Du32.to_be_bytes());
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&(-1i64).to_be_bytes());
    body
}

fn interface_desc_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&65535u32.to_be_bytes());
    body
}

fn enhanced_packet_body(ts_us: u64, data: &[u8]) -> Vec<u8> {
    let ts_high = ((ts_us >> 32) & 0xFFFF_FFFF) as u32;
    let ts_low = (ts_us & 0xFFFF_FFFF) as u32;
    let cap_len = data.len() as u32;
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&ts_high.to_be_bytes());
    body.extend_from_slice(&ts_low.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(data);
    let pad_len = (4 - (data.len() % 4)) % 4;
    body.resize(body.len() + pad_len, 0);
    body
}
