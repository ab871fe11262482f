//! rpcshark core library for offline analysis of RPC-style and
//! stream-framed protocols in PCAP captures.
//!
//! The pipeline runs strictly in capture order: packet sources yield frames,
//! `transport` slices them to TCP/UDP payloads and restores TCP byte order,
//! `framing` recovers PDUs from the byte stream, `session` keeps one state
//! container per connection, `correlation` links invokes to their results and
//! `dispatch` hands PDU bodies to registered decoders. Findings are collected
//! as non-fatal diagnostics and aggregated into a deterministic report.
//!
//! Invariants:
//! - Frame numbers start at 1; 0 means "unset" everywhere.
//! - A PDU is never emitted before all of its declared bytes are present.
//! - The dispatch registry is frozen before the first PDU is dispatched.
//! - Report outputs are deterministic and stable across runs.
//!
//! Version française (résumé):
//! Cette crate analyse hors ligne des captures : source -> transport ->
//! découpage en PDU -> sessions -> corrélation requête/réponse -> décodeurs
//! enregistrés -> rapport déterministe. Aucune anomalie n'interrompt
//! l'analyse ; elles deviennent des diagnostics.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use rpcshark_core::analyze_pcap_file;
//!
//! let report = analyze_pcap_file(Path::new("capture.pcapng"))?;
//! println!("{} PDUs", report.pdus.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod analysis;
pub mod config;
pub mod correlation;
pub mod diagnostics;
pub mod dispatch;
pub mod framing;
pub mod protocols;
pub mod session;
mod source;
pub mod transport;

pub use analysis::{
    AnalysisError, Analyzer, analyze_pcap_file, analyze_pcap_file_with_config, analyze_source,
    analyze_source_with_config,
};
pub use config::{AnalysisConfig, ConfigError};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use source::{PacketEvent, PacketSource, PcapFileSource, SourceError};

/// Capture-order frame number, 1-based.
pub type FrameNumber = u32;

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no capture time is available.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";
/// Maximum number of examples kept per diagnostic.
pub const MAX_DIAGNOSTIC_EXAMPLES: usize = 3;

/// Aggregated analysis report with deterministic ordering.
///
/// # Examples
/// ```
/// use rpcshark_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.report_version, rpcshark_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// RFC3339 timestamp representing the report generation time.
    pub generated_at: String,

    /// Input capture metadata.
    pub input: InputInfo,

    /// Optional capture summary (may be empty when unavailable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_summary: Option<CaptureSummary>,
    /// Conversation summaries sorted by client, server and transport.
    pub conversations: Vec<ConversationSummary>,
    /// PDUs in emission order.
    pub pdus: Vec<PduSummary>,
    /// Diagnostics aggregated by id, most severe first.
    pub diagnostics: Vec<DiagnosticSummary>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (e.g., "rpcshark").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input capture metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the analyzer.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Basic capture summary (timestamps may be absent).
///
/// # Examples
/// ```
/// use rpcshark_core::CaptureSummary;
///
/// let summary = CaptureSummary {
///     packets_total: 10,
///     time_start: None,
///     time_end: None,
/// };
/// assert_eq!(summary.packets_total, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSummary {
    /// Total packet count observed in the capture.
    pub packets_total: u64,
    /// RFC3339 timestamp of the first packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the last packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// One analysed connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// "tcp" or "udp".
    pub transport: String,
    /// Client endpoint in `ip:port` form.
    pub client: String,
    /// Server endpoint in `ip:port` form.
    pub server: String,
    /// Protocol name (e.g., "ros", "wow").
    pub protocol: String,
    /// Frames observed on the connection.
    pub frames: u64,
    /// PDUs recovered from the connection.
    pub pdus: u64,
    /// Correlation counters for RPC-style protocols.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocations: Option<InvocationSummary>,
}

/// Invoke/result matching counters of one conversation.
///
/// `invokes == matched + evicted + outstanding` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationSummary {
    pub invokes: u64,
    pub matched: u64,
    /// Invokes replaced by a later invoke reusing their id.
    pub evicted: u64,
    /// Results that matched no invoke.
    pub unmatched_results: u64,
    /// Invokes still unanswered at end of capture.
    pub outstanding: u64,
}

/// One recovered PDU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PduSummary {
    /// Frame that completed the PDU.
    pub frame: FrameNumber,
    /// Conversation in `transport a <-> b` form.
    pub conversation: String,
    pub protocol: String,
    /// "client_to_server" or "server_to_client".
    pub direction: String,
    /// PDU length in bytes, headers included.
    pub length: u64,
    /// Message type (APDU kind or command name).
    pub message: String,
    /// Operation or error name from the registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoke_id: Option<u32>,
    /// On an invoke: frame of the matching result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_in: Option<FrameNumber>,
    /// On a result: frame of the invoke it answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_to: Option<FrameNumber>,
    /// On a result: seconds since the invoke.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_s: Option<f64>,
}

/// Diagnostics of one kind, aggregated.
///
/// # Examples
/// ```
/// use rpcshark_core::DiagnosticSummary;
///
/// let summary = DiagnosticSummary {
///     id: "RS-UNKNOWN-OPERATION".to_string(),
///     severity: "warning".to_string(),
///     message: "operation not implemented for a known protocol".to_string(),
///     count: 1,
///     examples: vec!["frame 4 bytes 0..12: unknown invoke code 42 for protocol 2.5.9.1".to_string()],
/// };
/// assert_eq!(summary.count, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    /// Stable identifier (e.g., `RS-DECODE-STALL`).
    pub id: String,
    /// Severity label (`note`, `warning` or `error`).
    pub severity: String,
    pub message: String,
    pub count: u64,
    /// At most three occurrences, formatted as `frame N bytes a..b: message`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use rpcshark_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.report_version, rpcshark_core::REPORT_VERSION);
/// assert!(report.pdus.is_empty());
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "rpcshark".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        capture_summary: None,
        conversations: vec![],
        pdus: vec![],
        diagnostics: vec![],
    }
}
