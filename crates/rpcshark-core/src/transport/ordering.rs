//! In-order delivery of one TCP direction.
//!
//! Captures may contain retransmissions, overlapping segments and segments
//! that arrive ahead of a gap. `SegmentOrdering` hands the frame assembler
//! only bytes that extend the contiguous stream, holding early segments
//! until the gap closes. Sequence numbers are compared with wrapping
//! arithmetic.
//!
//! Without a SYN the first captured segment anchors the stream. A segment
//! that later turns up below that anchor cannot be spliced in front of
//! bytes the assembler already consumed, so its leading bytes are recorded
//! as [`LateBytes`] instead of being mistaken for a retransmission.

use std::collections::BTreeMap;

use tracing::debug;

use crate::FrameNumber;

/// Contiguous stream bytes released by the ordering stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredSegment {
    pub frame: FrameNumber,
    pub ts: Option<f64>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
struct HeldSegment {
    frame: FrameNumber,
    ts: Option<f64>,
    payload: Vec<u8>,
}

/// Bytes still held behind a gap when the stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndeliveredBytes {
    pub segments: usize,
    pub bytes: usize,
    /// Last frame that contributed a held segment.
    pub frame: FrameNumber,
}

/// Leading bytes of a segment that precede everything already delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LateBytes {
    pub frame: FrameNumber,
    pub seq: u32,
    pub bytes: usize,
}

#[derive(Debug)]
pub struct SegmentOrdering {
    next_seq: Option<u32>,
    /// Lowest sequence number delivered or reported late.
    window_start: Option<u32>,
    held: BTreeMap<u32, HeldSegment>,
    late: Vec<LateBytes>,
    max_held: usize,
}

impl SegmentOrdering {
    pub fn new(max_held: usize) -> Self {
        Self {
            next_seq: None,
            window_start: None,
            held: BTreeMap::new(),
            late: Vec::new(),
            max_held: max_held.max(1),
        }
    }

    /// Accept one captured segment and return every payload that is now in
    /// order.
    pub fn accept(
        &mut self,
        seq: u32,
        syn: bool,
        frame: FrameNumber,
        ts: Option<f64>,
        payload: &[u8],
    ) -> Vec<DeliveredSegment> {
        let mut delivered = Vec::new();
        // SYN consumes one sequence number.
        let seq = if syn {
            self.next_seq = Some(seq.wrapping_add(1));
            self.window_start = Some(seq.wrapping_add(1));
            seq.wrapping_add(1)
        } else {
            seq
        };
        if payload.is_empty() {
            return delivered;
        }

        let expected = *self.next_seq.get_or_insert(seq);
        let ahead = seq.wrapping_sub(expected) as i32;

        if ahead > 0 {
            debug!(frame, seq, expected, "holding segment ahead of gap");
            self.held.entry(seq).or_insert(HeldSegment {
                frame,
                ts,
                payload: payload.to_vec(),
            });
            if self.held.len() > self.max_held {
                self.skip_gap(&mut delivered);
            }
            return delivered;
        }

        self.note_late(frame, seq, payload.len());
        let overlap = expected.wrapping_sub(seq) as usize;
        if overlap >= payload.len() {
            debug!(frame, seq, "dropping retransmitted segment");
            return delivered;
        }
        self.release(frame, ts, &payload[overlap..], &mut delivered);
        self.drain_held(&mut delivered);
        delivered
    }

    /// Late leading bytes recorded since the last call.
    pub fn take_late(&mut self) -> Vec<LateBytes> {
        std::mem::take(&mut self.late)
    }

    /// Report whatever stayed behind a gap and reset the direction.
    pub fn finish(&mut self) -> Option<UndeliveredBytes> {
        let held = std::mem::take(&mut self.held);
        self.next_seq = None;
        self.window_start = None;
        let frame = held.values().map(|segment| segment.frame).max()?;
        Some(UndeliveredBytes {
            segments: held.len(),
            bytes: held.values().map(|segment| segment.payload.len()).sum(),
            frame,
        })
    }

    pub fn held_segments(&self) -> usize {
        self.held.len()
    }

    fn note_late(&mut self, frame: FrameNumber, seq: u32, len: usize) {
        let Some(start) = self.window_start else {
            return;
        };
        let before = start.wrapping_sub(seq) as i32;
        if before <= 0 {
            return;
        }
        let bytes = (before as usize).min(len);
        debug!(frame, seq, start, bytes, "segment precedes the delivered stream");
        self.late.push(LateBytes { frame, seq, bytes });
        self.window_start = Some(seq);
    }

    fn release(
        &mut self,
        frame: FrameNumber,
        ts: Option<f64>,
        payload: &[u8],
        delivered: &mut Vec<DeliveredSegment>,
    ) {
        let expected = self.next_seq.unwrap_or_default();
        self.window_start.get_or_insert(expected);
        self.next_seq = Some(expected.wrapping_add(payload.len() as u32));
        delivered.push(DeliveredSegment {
            frame,
            ts,
            payload: payload.to_vec(),
        });
    }

    fn drain_held(&mut self, delivered: &mut Vec<DeliveredSegment>) {
        while let Some(expected) = self.next_seq {
            let Some((&seq, _)) = self
                .held
                .iter()
                .find(|(seq, _)| (seq.wrapping_sub(expected) as i32) <= 0)
            else {
                break;
            };
            let Some(segment) = self.held.remove(&seq) else {
                break;
            };
            let overlap = expected.wrapping_sub(seq) as usize;
            if overlap < segment.payload.len() {
                self.release(
                    segment.frame,
                    segment.ts,
                    &segment.payload[overlap..],
                    delivered,
                );
            }
        }
    }

    /// Give up on the oldest gap: resume at the lowest held sequence number.
    fn skip_gap(&mut self, delivered: &mut Vec<DeliveredSegment>) {
        let Some(expected) = self.next_seq else {
            return;
        };
        let Some(&lowest) = self
            .held
            .keys()
            .min_by_key(|seq| seq.wrapping_sub(expected))
        else {
            return;
        };
        debug!(
            expected,
            resume = lowest,
            "sequence gap never closed, resuming after it"
        );
        self.next_seq = Some(lowest);
        self.drain_held(delivered);
    }
}

#[cfg(test)]
mod tests {
    use super::SegmentOrdering;

    fn payloads(delivered: &[super::DeliveredSegment]) -> Vec<Vec<u8>> {
        delivered.iter().map(|d| d.payload.clone()).collect()
    }

    #[test]
    fn in_order_segments_pass_through() {
        let mut ordering = SegmentOrdering::new(8);
        assert!(ordering.accept(99, true, 1, None, &[]).is_empty());
        let first = ordering.accept(100, false, 2, Some(1.0), b"abc");
        let second = ordering.accept(103, false, 3, Some(1.1), b"de");
        assert_eq!(payloads(&first), vec![b"abc".to_vec()]);
        assert_eq!(payloads(&second), vec![b"de".to_vec()]);
        assert_eq!(second[0].frame, 3);
    }

    #[test]
    fn retransmission_is_dropped() {
        let mut ordering = SegmentOrdering::new(8);
        ordering.accept(10, false, 1, None, b"abcd");
        assert!(ordering.accept(10, false, 2, None, b"abcd").is_empty());
    }

    #[test]
    fn overlapping_segment_delivers_only_new_bytes() {
        let mut ordering = SegmentOrdering::new(8);
        ordering.accept(10, false, 1, None, b"abcd");
        let delivered = ordering.accept(12, false, 2, None, b"cdef");
        assert_eq!(payloads(&delivered), vec![b"ef".to_vec()]);
    }

    #[test]
    fn early_segment_waits_for_gap() {
        let mut ordering = SegmentOrdering::new(8);
        ordering.accept(0, false, 1, None, b"ab");
        assert!(ordering.accept(4, false, 2, None, b"ef").is_empty());
        assert_eq!(ordering.held_segments(), 1);
        let delivered = ordering.accept(2, false, 3, None, b"cd");
        assert_eq!(payloads(&delivered), vec![b"cd".to_vec(), b"ef".to_vec()]);
        assert_eq!(delivered[1].frame, 2);
        assert_eq!(ordering.held_segments(), 0);
    }

    #[test]
    fn sequence_wraparound_is_contiguous() {
        let mut ordering = SegmentOrdering::new(8);
        ordering.accept(u32::MAX - 1, false, 1, None, b"ab");
        let delivered = ordering.accept(0, false, 2, None, b"cd");
        assert_eq!(payloads(&delivered), vec![b"cd".to_vec()]);
    }

    #[test]
    fn too_many_held_segments_skip_the_gap() {
        let mut ordering = SegmentOrdering::new(1);
        ordering.accept(0, false, 1, None, b"ab");
        assert!(ordering.accept(10, false, 2, None, b"kl").is_empty());
        let delivered = ordering.accept(12, false, 3, None, b"mn");
        assert_eq!(payloads(&delivered), vec![b"kl".to_vec(), b"mn".to_vec()]);
    }

    #[test]
    fn segment_below_the_first_delivered_byte_is_late() {
        let mut ordering = SegmentOrdering::new(8);
        ordering.accept(1004, false, 1, None, b"efgh");
        assert!(ordering.accept(1000, false, 2, None, b"abcd").is_empty());
        let late = ordering.take_late();
        assert_eq!(late.len(), 1);
        assert_eq!((late[0].frame, late[0].seq, late[0].bytes), (2, 1000, 4));
        assert!(ordering.take_late().is_empty());

        // a repeat of the late segment is a plain retransmission now
        assert!(ordering.accept(1000, false, 3, None, b"abcd").is_empty());
        assert!(ordering.take_late().is_empty());
    }

    #[test]
    fn late_segment_still_delivers_its_new_tail() {
        let mut ordering = SegmentOrdering::new(8);
        ordering.accept(1004, false, 1, None, b"ef");
        let delivered = ordering.accept(1002, false, 2, None, b"cdefgh");
        assert_eq!(payloads(&delivered), vec![b"gh".to_vec()]);
        assert_eq!(ordering.take_late()[0].bytes, 2);
    }

    #[test]
    fn retransmission_inside_the_window_is_not_late() {
        let mut ordering = SegmentOrdering::new(8);
        ordering.accept(10, false, 1, None, b"abcd");
        ordering.accept(14, false, 2, None, b"ef");
        assert!(ordering.accept(12, false, 3, None, b"cd").is_empty());
        assert!(ordering.take_late().is_empty());
    }

    #[test]
    fn finish_reports_held_bytes() {
        let mut ordering = SegmentOrdering::new(8);
        ordering.accept(0, false, 1, None, b"ab");
        ordering.accept(10, false, 4, None, b"xyz");
        let undelivered = ordering.finish().unwrap();
        assert_eq!(undelivered.segments, 1);
        assert_eq!(undelivered.bytes, 3);
        assert_eq!(undelivered.frame, 4);
        assert!(ordering.finish().is_none());
    }
}
