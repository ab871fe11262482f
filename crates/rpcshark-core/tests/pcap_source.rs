mod common;

use std::fs;

use rpcshark_core::{PacketSource, PcapFileSource, SourceError};
use tempfile::tempdir;

use common::{CLIENT, Capture, ROS_SERVER};

fn sample() -> Capture {
    let mut capture = Capture::new();
    capture
        .tcp(1_000_000, CLIENT, ROS_SERVER, 1000, b"abc")
        .tcp(1_500_000, ROS_SERVER, CLIENT, 5000, b"de")
        .udp(2_000_000, CLIENT, ([10, 0, 0, 1], 9000), b"f");
    capture
}

fn read_all(source: &mut PcapFileSource) -> Vec<(u32, Option<f64>)> {
    let mut frames = Vec::new();
    while let Some(event) = source.next_packet().unwrap() {
        frames.push((event.frame, event.ts));
    }
    frames
}

#[test]
fn pcapng_frames_are_numbered_from_one() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.pcapng");
    sample().write_pcapng(&path);

    let mut source = PcapFileSource::open(&path).unwrap();
    let frames = read_all(&mut source);
    assert_eq!(
        frames.iter().map(|(frame, _)| *frame).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(frames[1].1, Some(1.5));
}

#[test]
fn legacy_pcap_is_read_too() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.pcap");
    sample().write_pcap(&path);

    let mut source = PcapFileSource::open(&path).unwrap();
    let frames = read_all(&mut source);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2], (3, Some(2.0)));
}

#[test]
fn pcap_source_rejects_truncated_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("truncated.pcapng");
    fs::write(&path, [0x0a, 0x0d, 0x0d]).unwrap();

    let err = match PcapFileSource::open(&path) {
        Ok(_) => panic!("expected truncated file to be rejected"),
        Err(err) => err,
    };
    assert!(matches!(err, SourceError::Io(_)));
}
