//! Non-fatal findings raised while framing, correlating and dispatching.
//!
//! Nothing here aborts an analysis run. Every diagnostic carries the frame
//! it was raised in and the byte range it covers, relative to the PDU once
//! it leaves the dispatcher.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::FrameNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// A length field declared less than its own header.
    MalformedHeader,
    /// Opcode absent from a registered protocol's tables.
    UnknownOperation,
    /// Protocol identifier that was never registered.
    UnresolvedIdentifier,
    /// A decoder stopped consuming bytes before the body ended.
    StructuralDecodeStall,
    /// The protocol envelope of a PDU could not be parsed.
    MalformedMessage,
    /// Bytes left over when a stream ended.
    TrailingData,
    /// Segment bytes that precede the already reassembled stream.
    LateSegment,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 7] = [
        DiagnosticKind::MalformedHeader,
        DiagnosticKind::UnknownOperation,
        DiagnosticKind::UnresolvedIdentifier,
        DiagnosticKind::StructuralDecodeStall,
        DiagnosticKind::MalformedMessage,
        DiagnosticKind::TrailingData,
        DiagnosticKind::LateSegment,
    ];

    /// Stable identifier used in reports.
    pub fn id(self) -> &'static str {
        match self {
            DiagnosticKind::MalformedHeader => "RS-MALFORMED-HEADER",
            DiagnosticKind::UnknownOperation => "RS-UNKNOWN-OPERATION",
            DiagnosticKind::UnresolvedIdentifier => "RS-UNRESOLVED-IDENTIFIER",
            DiagnosticKind::StructuralDecodeStall => "RS-DECODE-STALL",
            DiagnosticKind::MalformedMessage => "RS-MALFORMED-MESSAGE",
            DiagnosticKind::TrailingData => "RS-TRAILING-DATA",
            DiagnosticKind::LateSegment => "RS-LATE-SEGMENT",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::MalformedHeader | DiagnosticKind::StructuralDecodeStall => {
                Severity::Error
            }
            DiagnosticKind::UnknownOperation
            | DiagnosticKind::UnresolvedIdentifier
            | DiagnosticKind::MalformedMessage
            | DiagnosticKind::TrailingData
            | DiagnosticKind::LateSegment => Severity::Warning,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DiagnosticKind::MalformedHeader => "declared PDU length shorter than its header",
            DiagnosticKind::UnknownOperation => "operation not implemented for a known protocol",
            DiagnosticKind::UnresolvedIdentifier => "no decoder registered for protocol identifier",
            DiagnosticKind::StructuralDecodeStall => "decoder stopped before the end of the body",
            DiagnosticKind::MalformedMessage => "message envelope could not be parsed",
            DiagnosticKind::TrailingData => "incomplete PDU bytes at end of stream",
            DiagnosticKind::LateSegment => "segment arrived after later stream bytes were framed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub frame: FrameNumber,
    pub range: Range<usize>,
}

impl Diagnostic {
    /// Diagnostic with the kind's default severity.
    pub fn new(
        kind: DiagnosticKind,
        frame: FrameNumber,
        range: Range<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            message: message.into(),
            frame,
            range,
        }
    }

    /// Shift the byte range, e.g. from body-relative to PDU-relative.
    pub fn offset_by(mut self, offset: usize) -> Self {
        self.range = (self.range.start + offset)..(self.range.end + offset);
        self
    }

    /// `frame N bytes a..b`, the prefix of every report example.
    pub fn location(&self) -> String {
        format!(
            "frame {} bytes {}..{}",
            self.frame, self.range.start, self.range.end
        )
    }
}

/// Collecting diagnostic sink that mirrors entries to `tracing`.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Note => debug!(
                id = diagnostic.kind.id(),
                frame = diagnostic.frame,
                "{}",
                diagnostic.message
            ),
            Severity::Warning | Severity::Error => warn!(
                id = diagnostic.kind.id(),
                frame = diagnostic.frame,
                "{}",
                diagnostic.message
            ),
        }
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        for diagnostic in iter {
            self.push(diagnostic);
        }
    }
}
