use std::sync::Arc;

use tracing::trace;

use super::registry::{Decoder, MessageKind, Registry, SessionHandle};
use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// Which table answered a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Registered,
    Generic,
    /// No decoder: the body was taken as one opaque block.
    Structural,
}

#[derive(Debug, PartialEq)]
pub struct DispatchOutcome {
    pub consumed: usize,
    pub resolution: Resolution,
    /// Ranges are relative to the dispatched body.
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs decoders from a frozen [`Registry`] over PDU bodies.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn dispatch(
        &self,
        protocol_id: &str,
        code: i32,
        kind: MessageKind,
        body: &[u8],
        session: &SessionHandle<'_>,
    ) -> DispatchOutcome {
        if let Some(decoder) = self.registry.resolve(protocol_id, code, kind) {
            return drive(decoder, Resolution::Registered, body, session);
        }
        if let Some(decoder) = self.registry.generic(protocol_id) {
            return drive(decoder, Resolution::Generic, body, session);
        }

        let diagnostic = if self.registry.contains(protocol_id) {
            Diagnostic::new(
                DiagnosticKind::UnknownOperation,
                session.frame,
                0..body.len(),
                format!("unknown {kind} code {code} for protocol {protocol_id}"),
            )
        } else {
            Diagnostic::new(
                DiagnosticKind::UnresolvedIdentifier,
                session.frame,
                0..body.len(),
                format!("dissector for {protocol_id} not implemented"),
            )
        };
        DispatchOutcome {
            consumed: body.len(),
            resolution: Resolution::Structural,
            diagnostics: vec![diagnostic],
        }
    }
}

/// Feed the body to `decoder` until it is exhausted or the decoder stalls.
fn drive(
    decoder: &dyn Decoder,
    resolution: Resolution,
    body: &[u8],
    session: &SessionHandle<'_>,
) -> DispatchOutcome {
    let mut offset = 0;
    let mut diagnostics = Vec::new();
    while offset < body.len() {
        let remaining = body.len() - offset;
        let used = decoder.decode(&body[offset..], session);
        if used == 0 {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::StructuralDecodeStall,
                session.frame,
                offset..body.len(),
                format!("decoder consumed nothing with {remaining} bytes left"),
            ));
            offset = body.len();
            break;
        }
        offset += used.min(remaining);
    }
    trace!(frame = session.frame, consumed = offset, ?resolution, "dispatched body");
    DispatchOutcome {
        consumed: offset,
        resolution,
        diagnostics,
    }
}
