use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, trace};

use crate::config::{AnalysisConfig, ConfigError};
use crate::correlation::{Annotation, InvocationId};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::dispatch::{Dispatcher, Registry, RegistryError, SessionHandle};
use crate::framing::{
    Datagram, LengthExtractor, MalformedBlock, MalformedReason, Pdu, RuleExtractor,
};
use crate::protocols::{ProtocolKind, Role, builtin_registry, ros, wow};
use crate::session::{ConversationKey, Session, SessionProfile, SessionStore};
use crate::source::{PacketEvent, PacketSource, PcapFileSource, SourceError};
use crate::transport::{DeliveredSegment, LateBytes, parse_segment};
use crate::{
    CaptureSummary, DEFAULT_GENERATED_AT, FrameNumber, PduSummary, Report, make_stub_report,
};

mod conversations;
mod findings;

use conversations::build_conversation_summaries;
use findings::build_diagnostic_summaries;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub fn analyze_pcap_file(path: &Path) -> Result<Report, AnalysisError> {
    analyze_pcap_file_with_config(path, &AnalysisConfig::default())
}

pub fn analyze_pcap_file_with_config(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<Report, AnalysisError> {
    let source = PcapFileSource::open(path)?;
    analyze_source_with_config(path, source, config)
}

pub fn analyze_source<S: PacketSource>(path: &Path, source: S) -> Result<Report, AnalysisError> {
    analyze_source_with_config(path, source, &AnalysisConfig::default())
}

pub fn analyze_source_with_config<S: PacketSource>(
    path: &Path,
    mut source: S,
    config: &AnalysisConfig,
) -> Result<Report, AnalysisError> {
    let mut analyzer = Analyzer::new(config.clone())?;
    while let Some(event) = source.next_packet()? {
        analyzer.process(&event);
    }
    Ok(analyzer.finish(&path.display().to_string(), path.metadata()?.len()))
}

/// Stateless parts shared by every session.
struct Pipeline {
    dispatcher: Dispatcher,
    tpkt: RuleExtractor,
    wow: RuleExtractor,
    ros_context: String,
}

impl Pipeline {
    fn extractor(&self, protocol: ProtocolKind) -> &dyn LengthExtractor {
        match protocol {
            ProtocolKind::RosTpkt => &self.tpkt,
            ProtocolKind::RosDatagram => &Datagram,
            ProtocolKind::Wow => &self.wow,
        }
    }

    fn protocol_id(&self, protocol: ProtocolKind) -> &str {
        match protocol {
            ProtocolKind::RosTpkt | ProtocolKind::RosDatagram => &self.ros_context,
            ProtocolKind::Wow => wow::layout::PROTOCOL_ID,
        }
    }
}

/// Invoke PDU waiting to learn where its result was seen.
struct Backfill {
    index: usize,
    key: ConversationKey,
    invoke_id: InvocationId,
    request_frame: FrameNumber,
}

#[derive(Default)]
struct Output {
    pdus: Vec<PduSummary>,
    backfill: Vec<Backfill>,
    diagnostics: Diagnostics,
}

/// Single-pass analysis over frames in capture order.
pub struct Analyzer {
    config: AnalysisConfig,
    pipeline: Pipeline,
    sessions: SessionStore,
    output: Output,
    packets_total: u64,
    first_ts: Option<f64>,
    last_ts: Option<f64>,
}

impl Analyzer {
    /// Analyzer with the built-in protocol tables.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let registry = builtin_registry()?.build();
        Self::with_registry(config, Arc::new(registry))
    }

    /// Analyzer dispatching through a caller-built registry.
    pub fn with_registry(
        config: AnalysisConfig,
        registry: Arc<Registry>,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        let pipeline = Pipeline {
            dispatcher: Dispatcher::new(registry),
            tpkt: ros::tpkt_extractor(),
            wow: wow::length_extractor(),
            ros_context: config.ros_context.clone(),
        };
        Ok(Self {
            config,
            pipeline,
            sessions: SessionStore::new(),
            output: Output::default(),
            packets_total: 0,
            first_ts: None,
            last_ts: None,
        })
    }

    pub fn process(&mut self, event: &PacketEvent) {
        self.packets_total += 1;
        update_ts_bounds(&mut self.first_ts, &mut self.last_ts, event.ts);

        let segment = match parse_segment(event.linktype, &event.data) {
            Ok(Some(segment)) => segment,
            Ok(None) => return,
            Err(err) => {
                trace!(frame = event.frame, %err, "frame skipped");
                return;
            }
        };
        let Some((protocol, server_port)) =
            self.config
                .protocol_for(segment.transport, segment.src.port(), segment.dst.port())
        else {
            return;
        };
        let server = if segment.dst.port() == server_port {
            segment.dst
        } else {
            segment.src
        };

        let key = ConversationKey::new(segment.transport, segment.src, segment.dst);
        let profile = SessionProfile {
            protocol,
            server,
            max_out_of_order_segments: self.config.max_out_of_order_segments,
        };
        let Self {
            pipeline,
            sessions,
            output,
            ..
        } = self;
        let pipeline = &*pipeline;
        let session = sessions.get_or_create(key, profile);
        session.frames += 1;

        let direction = key.direction_of(segment.src);
        let hint = session.hint_for(segment.src);
        let delivered = match segment.tcp {
            Some(tcp) => {
                let ordering = &mut session.stream(direction).ordering;
                let delivered =
                    ordering.accept(tcp.seq, tcp.syn, event.frame, event.ts, segment.payload);
                for late in ordering.take_late() {
                    output.diagnostics.push(late_segment(&key, late));
                }
                delivered
            }
            None => vec![DeliveredSegment {
                frame: event.frame,
                ts: event.ts,
                payload: segment.payload.to_vec(),
            }],
        };

        let extractor = pipeline.extractor(session.protocol);
        for chunk in delivered {
            let assembly = session.stream(direction).buffer.push_segment(
                &chunk.payload,
                chunk.frame,
                hint,
                extractor,
            );
            for pdu in assembly.pdus {
                handle_pdu(pipeline, session, output, &pdu, chunk.ts);
            }
            if let Some(block) = assembly.malformed {
                output.diagnostics.push(malformed_block(&key, block));
            }
        }
    }

    /// Flush every session and build the report.
    pub fn finish(mut self, input_path: &str, input_bytes: u64) -> Report {
        for backfill in &self.output.backfill {
            let record = self.sessions.get(&backfill.key).and_then(|session| {
                session
                    .correlator
                    .lookup_completed(backfill.invoke_id, backfill.request_frame)
            });
            if let (Some(record), Some(pdu)) = (record, self.output.pdus.get_mut(backfill.index)) {
                pdu.response_in = Annotation::for_invoke(record).response_in;
            }
        }

        let mut sessions = self.sessions.drain();
        for session in &mut sessions {
            flush_session(session, &mut self.output.diagnostics);
        }

        let mut report = make_stub_report(input_path, input_bytes);
        report.capture_summary = Some(CaptureSummary {
            packets_total: self.packets_total,
            time_start: ts_to_rfc3339(self.first_ts),
            time_end: ts_to_rfc3339(self.last_ts),
        });
        report.generated_at = report
            .capture_summary
            .as_ref()
            .and_then(|summary| summary.time_end.clone().or(summary.time_start.clone()))
            .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
        report.conversations = build_conversation_summaries(&sessions);
        report.diagnostics = build_diagnostic_summaries(&self.output.diagnostics.into_vec());
        report.pdus = self.output.pdus;
        report
    }
}

fn handle_pdu(
    pipeline: &Pipeline,
    session: &mut Session,
    output: &mut Output,
    pdu: &Pdu,
    ts: Option<f64>,
) {
    session.pdus += 1;
    let protocol = session.protocol;
    let mut summary = PduSummary {
        frame: pdu.frame,
        conversation: session.key.to_string(),
        protocol: protocol.to_string(),
        direction: pdu.boundary.direction.as_str().to_string(),
        length: pdu.bytes.len() as u64,
        message: String::new(),
        operation: None,
        invoke_id: None,
        response_in: None,
        response_to: None,
        elapsed_s: None,
    };
    trace!(frame = pdu.frame, len = pdu.bytes.len(), %protocol, "pdu");

    let message = match protocol.parse(pdu) {
        Ok(message) => message,
        Err(err) => {
            output.diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedMessage,
                pdu.frame,
                0..pdu.bytes.len(),
                format!("{protocol} message on {}: {err}", session.key),
            ));
            summary.message = "malformed".to_string();
            output.pdus.push(summary);
            return;
        }
    };
    summary.message = message.name.to_string();
    summary.invoke_id = message.invoke_id;

    if let Some(id) = message.invoke_id {
        match message.role {
            Role::Invoke => match session.correlator.record_invoke(id, pdu.frame, ts) {
                Some(record) => {
                    summary.response_in = Annotation::for_invoke(&record).response_in;
                }
                None => output.backfill.push(Backfill {
                    index: output.pdus.len(),
                    key: session.key,
                    invoke_id: id,
                    request_frame: pdu.frame,
                }),
            },
            Role::Result => {
                if let Some(record) = session.correlator.record_result(id, pdu.frame) {
                    let annotation = Annotation::for_result(&record, ts);
                    summary.response_to = annotation.response_to;
                    summary.elapsed_s = annotation.elapsed;
                }
            }
            Role::Other => {}
        }
    }

    if let Some((kind, code)) = message.dispatch {
        let protocol_id = pipeline.protocol_id(protocol);
        let registry = pipeline.dispatcher.registry();
        summary.operation = registry.name(protocol_id, code, kind).map(str::to_string);

        let body = pdu.bytes.get(message.body.clone()).unwrap_or_default();
        let handle = SessionHandle {
            conversation: &session.key,
            direction: pdu.boundary.direction,
            frame: pdu.frame,
        };
        let outcome = pipeline
            .dispatcher
            .dispatch(protocol_id, code, kind, body, &handle);
        output.diagnostics.extend(
            outcome
                .diagnostics
                .into_iter()
                .map(|diagnostic| diagnostic.offset_by(message.body.start)),
        );
    }

    output.pdus.push(summary);
}

/// Report bytes that never became PDUs.
fn flush_session(session: &mut Session, diagnostics: &mut Diagnostics) {
    let key = session.key;
    for (direction, stream) in session.streams_mut() {
        if let Some(undelivered) = stream.ordering.finish() {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::TrailingData,
                undelivered.frame,
                0..undelivered.bytes,
                format!(
                    "{} bytes in {} segments held behind a sequence gap on {key} ({direction:?})",
                    undelivered.bytes, undelivered.segments
                ),
            ));
        }
        if let Some(block) = stream.buffer.finish() {
            diagnostics.push(malformed_block(&key, block));
        }
    }
    debug!(conversation = %key, pdus = session.pdus, "session closed");
}

fn late_segment(key: &ConversationKey, late: LateBytes) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::LateSegment,
        late.frame,
        0..late.bytes,
        format!(
            "{} bytes at seq {} precede the reassembled stream on {key} and were not framed",
            late.bytes, late.seq
        ),
    )
}

fn malformed_block(key: &ConversationKey, block: MalformedBlock) -> Diagnostic {
    match block.reason {
        MalformedReason::InvalidLength { declared, minimum } => Diagnostic::new(
            DiagnosticKind::MalformedHeader,
            block.frame,
            0..block.len,
            format!(
                "declared length {declared} is shorter than the {minimum}-byte header on {key}; {} bytes skipped",
                block.len
            ),
        ),
        MalformedReason::Truncated => Diagnostic::new(
            DiagnosticKind::TrailingData,
            block.frame,
            0..block.len,
            format!("{} bytes of an incomplete PDU at end of stream on {key}", block.len),
        ),
    }
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let ts = match ts {
        Some(ts) => ts,
        None => return,
    };
    match first {
        None => *first = Some(ts),
        Some(existing) => {
            if ts < *existing {
                *first = Some(ts);
            }
        }
    }
    match last {
        None => *last = Some(ts),
        Some(existing) => {
            if ts > *existing {
                *last = Some(ts);
            }
        }
    }
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_bounds_track_min_and_max() {
        let mut first = None;
        let mut last = None;
        for ts in [Some(5.0), None, Some(2.0), Some(9.0)] {
            update_ts_bounds(&mut first, &mut last, ts);
        }
        assert_eq!(first, Some(2.0));
        assert_eq!(last, Some(9.0));
    }

    #[test]
    fn rfc3339_formatting() {
        assert_eq!(ts_to_rfc3339(Some(0.0)).as_deref(), Some("1970-01-01T00:00:00Z"));
        assert_eq!(ts_to_rfc3339(None), None);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AnalysisConfig {
            max_out_of_order_segments: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            Analyzer::new(config),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn malformed_header_block_becomes_error_diagnostic() {
        let key = ConversationKey::new(
            crate::transport::Transport::Tcp,
            "10.0.0.1:102".parse().unwrap(),
            "10.0.0.2:4000".parse().unwrap(),
        );
        let diagnostic = malformed_block(
            &key,
            MalformedBlock {
                frame: 3,
                len: 9,
                reason: MalformedReason::InvalidLength {
                    declared: 2,
                    minimum: 4,
                },
            },
        );
        assert_eq!(diagnostic.kind, DiagnosticKind::MalformedHeader);
        assert_eq!(diagnostic.range, 0..9);
        assert!(diagnostic.message.contains("9 bytes skipped"));
    }
}
