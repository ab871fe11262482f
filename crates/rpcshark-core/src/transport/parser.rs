use std::net::{IpAddr, SocketAddr};

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap_parser::Linktype;

use super::Transport;
use super::error::TransportError;
use super::reader::SegmentReader;

/// TCP header fields needed for in-order delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpFlags {
    pub seq: u32,
    pub syn: bool,
}

/// One transport segment with its endpoints and application payload.
#[derive(Debug)]
pub struct Segment<'a> {
    pub transport: Transport,
    pub src: SocketAddr,
    pub dst: SocketAddr,
    pub payload: &'a [u8],
    /// Present for TCP segments only.
    pub tcp: Option<TcpFlags>,
}

/// Slice a link-layer frame down to its TCP or UDP payload.
///
/// Returns `Ok(None)` for frames that carry neither (ICMP, ARP, IP fragments
/// without a transport header, unsupported link types).
pub fn parse_segment(linktype: Linktype, data: &[u8]) -> Result<Option<Segment<'_>>, TransportError> {
    let sliced = match linktype {
        Linktype::ETHERNET => {
            SlicedPacket::from_ethernet(data).map_err(|e| TransportError::Slice(e.to_string()))?
        }
        Linktype::RAW => {
            SlicedPacket::from_ip(data).map_err(|e| TransportError::Slice(e.to_string()))?
        }
        _ => return Ok(None),
    };

    let net = sliced.net.ok_or(TransportError::MissingNetworkLayer)?;
    let Some(transport) = sliced.transport else {
        return Ok(None);
    };

    let (src_ip, dst_ip) = match net {
        NetSlice::Ipv4(ref ipv4) => (
            IpAddr::V4(ipv4.header().source_addr()),
            IpAddr::V4(ipv4.header().destination_addr()),
        ),
        NetSlice::Ipv6(ref ipv6) => (
            IpAddr::V6(ipv6.header().source_addr()),
            IpAddr::V6(ipv6.header().destination_addr()),
        ),
        #[allow(unreachable_patterns)]
        _ => return Ok(None),
    };

    let ip_payload = net.ip_payload_ref().ok_or(TransportError::MissingIpPayload)?;
    let reader = SegmentReader::new(ip_payload.payload);

    let segment = match transport {
        TransportSlice::Udp(udp) => Segment {
            transport: Transport::Udp,
            src: SocketAddr::new(src_ip, udp.source_port()),
            dst: SocketAddr::new(dst_ip, udp.destination_port()),
            payload: reader.udp_payload()?,
            tcp: None,
        },
        TransportSlice::Tcp(tcp) => Segment {
            transport: Transport::Tcp,
            src: SocketAddr::new(src_ip, tcp.source_port()),
            dst: SocketAddr::new(dst_ip, tcp.destination_port()),
            payload: reader.tcp_payload()?,
            tcp: Some(TcpFlags {
                seq: tcp.sequence_number(),
                syn: tcp.syn(),
            }),
        },
        _ => return Ok(None),
    };

    Ok(Some(segment))
}
