//! Correlator: links invoke messages to their results within one session.
//!
//! Two tables back the matching. `pending` is keyed by invocation id alone
//! and holds at most one unanswered invoke per id. `completed` is keyed by
//! `(invocation id, request frame)` so a finished exchange from an earlier
//! cycle is never confused with a later one that reuses the id.
//!
//! Captures are re-examined freely: feeding the same invoke or result frame
//! again returns the record already built for it and changes nothing.

use std::collections::HashMap;

use tracing::debug;

use crate::FrameNumber;

pub type InvocationId = u32;

/// One invoke/result exchange. A zero `response_frame` means "not yet answered".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvocationRecord {
    pub invocation_id: InvocationId,
    pub request_frame: FrameNumber,
    pub request_time: Option<f64>,
    pub response_frame: FrameNumber,
    pub is_request: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CompletedKey {
    invocation_id: InvocationId,
    request_frame: FrameNumber,
}

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationStats {
    pub invokes: u64,
    pub matched: u64,
    pub evicted: u64,
    pub unmatched_results: u64,
    pub outstanding: u64,
}

#[derive(Debug, Default)]
pub struct Correlator {
    pending: HashMap<InvocationId, InvocationRecord>,
    completed: HashMap<CompletedKey, InvocationRecord>,
    latest_completed: HashMap<InvocationId, FrameNumber>,
    stats: CorrelationStats,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an invoke seen in `frame`.
    ///
    /// Returns the finished exchange when this invoke was already answered,
    /// `None` otherwise. A pending invoke with the same id from another frame
    /// is replaced.
    pub fn record_invoke(
        &mut self,
        id: InvocationId,
        frame: FrameNumber,
        ts: Option<f64>,
    ) -> Option<InvocationRecord> {
        let key = CompletedKey {
            invocation_id: id,
            request_frame: frame,
        };
        if let Some(record) = self.completed.get(&key) {
            return Some(*record);
        }
        if let Some(existing) = self.pending.get(&id) {
            if existing.request_frame == frame {
                return None;
            }
            debug!(
                invocation_id = id,
                evicted_frame = existing.request_frame,
                frame,
                "invocation id reused before a result arrived"
            );
            self.stats.evicted += 1;
        }

        self.pending.insert(
            id,
            InvocationRecord {
                invocation_id: id,
                request_frame: frame,
                request_time: ts,
                response_frame: 0,
                is_request: true,
            },
        );
        self.stats.invokes += 1;
        None
    }

    /// Record a result or error seen in `frame`.
    ///
    /// An unanswered invoke for `id` takes precedence; otherwise the most
    /// recently completed exchange for `id` is returned unchanged. A result
    /// with neither is counted and dropped.
    pub fn record_result(
        &mut self,
        id: InvocationId,
        frame: FrameNumber,
    ) -> Option<InvocationRecord> {
        if let Some(mut record) = self.pending.remove(&id) {
            record.response_frame = frame;
            record.is_request = false;
            self.completed.insert(
                CompletedKey {
                    invocation_id: id,
                    request_frame: record.request_frame,
                },
                record,
            );
            self.latest_completed.insert(id, record.request_frame);
            self.stats.matched += 1;
            return Some(record);
        }

        let latest = self
            .latest_completed
            .get(&id)
            .and_then(|&request_frame| {
                self.completed.get(&CompletedKey {
                    invocation_id: id,
                    request_frame,
                })
            })
            .copied();
        if latest.is_none() {
            self.stats.unmatched_results += 1;
        }
        latest
    }

    pub fn lookup_completed(
        &self,
        id: InvocationId,
        request_frame: FrameNumber,
    ) -> Option<&InvocationRecord> {
        self.completed.get(&CompletedKey {
            invocation_id: id,
            request_frame,
        })
    }

    pub fn pending(&self, id: InvocationId) -> Option<&InvocationRecord> {
        self.pending.get(&id)
    }

    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> CorrelationStats {
        CorrelationStats {
            outstanding: self.pending.len() as u64,
            ..self.stats
        }
    }
}

/// Presentation data derived from a record with both legs known.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Annotation {
    pub response_in: Option<FrameNumber>,
    pub response_to: Option<FrameNumber>,
    pub elapsed: Option<f64>,
}

impl Annotation {
    /// Invoke side: where the answer was seen.
    pub fn for_invoke(record: &InvocationRecord) -> Self {
        Self {
            response_in: (record.response_frame != 0).then_some(record.response_frame),
            ..Self::default()
        }
    }

    /// Result side: which invoke it answers and how long it took.
    pub fn for_result(record: &InvocationRecord, ts: Option<f64>) -> Self {
        let elapsed = match (ts, record.request_time) {
            (Some(now), Some(then)) => Some(now - then),
            _ => None,
        };
        Self {
            response_in: None,
            response_to: Some(record.request_frame),
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_then_result_annotates_both_sides() {
        let mut correlator = Correlator::new();
        assert!(correlator.record_invoke(7, 10, Some(0.0)).is_none());
        let record = correlator.record_result(7, 12).unwrap();

        let invoke = Annotation::for_invoke(&record);
        assert_eq!(invoke.response_in, Some(12));

        let result = Annotation::for_result(&record, Some(0.5));
        assert_eq!(result.response_to, Some(10));
        assert_eq!(result.elapsed, Some(0.5));
    }

    #[test]
    fn repeated_result_returns_identical_record() {
        let mut correlator = Correlator::new();
        correlator.record_invoke(1, 3, Some(1.0));
        let first = correlator.record_result(1, 4).unwrap();
        let second = correlator.record_result(1, 4).unwrap();
        let later_segment = correlator.record_result(1, 5).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, later_segment);
        assert_eq!(first.response_frame, 4);
        assert!(!first.is_request);
        assert_eq!(correlator.stats().matched, 1);
    }

    #[test]
    fn reused_id_evicts_unanswered_invoke() {
        let mut correlator = Correlator::new();
        correlator.record_invoke(3, 1, None);
        correlator.record_invoke(3, 5, None);
        assert_eq!(correlator.outstanding(), 1);
        assert_eq!(correlator.pending(3).unwrap().request_frame, 5);

        let record = correlator.record_result(3, 6).unwrap();
        assert_eq!(record.request_frame, 5);
        assert!(correlator.lookup_completed(3, 1).is_none());

        let stats = correlator.stats();
        assert_eq!(stats.invokes, 2);
        assert_eq!(stats.evicted, 1);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.outstanding, 0);
    }

    #[test]
    fn result_without_invoke_is_silent() {
        let mut correlator = Correlator::new();
        assert!(correlator.record_result(9, 2).is_none());
        assert_eq!(correlator.stats().unmatched_results, 1);
        assert_eq!(correlator.outstanding(), 0);
    }

    #[test]
    fn re_examined_invoke_returns_completed_record() {
        let mut correlator = Correlator::new();
        correlator.record_invoke(2, 8, Some(3.0));
        correlator.record_result(2, 9);
        let again = correlator.record_invoke(2, 8, Some(3.0)).unwrap();
        assert_eq!(again.response_frame, 9);
        assert_eq!(correlator.outstanding(), 0);
        assert_eq!(correlator.stats().invokes, 1);
    }

    #[test]
    fn re_examined_pending_invoke_is_not_an_eviction() {
        let mut correlator = Correlator::new();
        correlator.record_invoke(4, 2, None);
        assert!(correlator.record_invoke(4, 2, None).is_none());
        assert_eq!(correlator.stats().evicted, 0);
        assert_eq!(correlator.stats().invokes, 1);
    }

    #[test]
    fn new_cycle_takes_precedence_over_completed_one() {
        let mut correlator = Correlator::new();
        correlator.record_invoke(5, 1, Some(0.0));
        correlator.record_result(5, 2);
        correlator.record_invoke(5, 10, Some(4.0));

        let record = correlator.record_result(5, 11).unwrap();
        assert_eq!(record.request_frame, 10);
        assert_eq!(correlator.lookup_completed(5, 1).unwrap().response_frame, 2);
        assert_eq!(correlator.lookup_completed(5, 10).unwrap().response_frame, 11);
    }

    #[test]
    fn every_pending_insert_leaves_exactly_once() {
        let mut correlator = Correlator::new();
        for frame in 1..=20u32 {
            let id = frame % 4;
            if frame % 3 == 0 {
                correlator.record_result(id, frame);
            } else {
                correlator.record_invoke(id, frame, None);
            }
        }
        let stats = correlator.stats();
        assert_eq!(stats.invokes, stats.matched + stats.evicted + stats.outstanding);
    }

    #[test]
    fn elapsed_needs_both_timestamps() {
        let record = InvocationRecord {
            invocation_id: 1,
            request_frame: 1,
            request_time: None,
            response_frame: 2,
            is_request: false,
        };
        assert_eq!(Annotation::for_result(&record, Some(1.0)).elapsed, None);
        assert_eq!(Annotation::for_invoke(&record).response_in, Some(2));
    }
}
