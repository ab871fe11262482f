use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::error::RegistryError;
use crate::FrameNumber;
use crate::framing::DirectionHint;
use crate::session::ConversationKey;

/// Role of a message within an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    InvokeArgument,
    Result,
    Error,
    BindInvoke,
    BindResult,
    BindError,
    UnbindInvoke,
    UnbindResult,
    UnbindError,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::InvokeArgument => "invoke",
            MessageKind::Result => "result",
            MessageKind::Error => "error",
            MessageKind::BindInvoke => "bind_invoke",
            MessageKind::BindResult => "bind_result",
            MessageKind::BindError => "bind_error",
            MessageKind::UnbindInvoke => "unbind_invoke",
            MessageKind::UnbindResult => "unbind_result",
            MessageKind::UnbindError => "unbind_error",
        }
    }

    /// Table key for operation-side kinds, `None` for error kinds.
    fn op_code(self, code: i32) -> Option<OpCode> {
        match self {
            MessageKind::InvokeArgument | MessageKind::Result => Some(OpCode::Local(code)),
            MessageKind::BindInvoke | MessageKind::BindResult => Some(OpCode::Bind),
            MessageKind::UnbindInvoke | MessageKind::UnbindResult => Some(OpCode::Unbind),
            MessageKind::Error | MessageKind::BindError | MessageKind::UnbindError => None,
        }
    }

    fn error_code(self, code: i32) -> Option<ErrorCode> {
        match self {
            MessageKind::Error => Some(ErrorCode::Local(code)),
            MessageKind::BindError => Some(ErrorCode::Bind),
            MessageKind::UnbindError => Some(ErrorCode::Unbind),
            _ => None,
        }
    }

    fn is_argument(self) -> bool {
        matches!(
            self,
            MessageKind::InvokeArgument | MessageKind::BindInvoke | MessageKind::UnbindInvoke
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation selector. Bind and unbind live outside the integer space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Local(i32),
    Bind,
    Unbind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Local(i32),
    Bind,
    Unbind,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpCode::Local(code) => write!(f, "{code}"),
            OpCode::Bind => f.write_str("bind"),
            OpCode::Unbind => f.write_str("unbind"),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Local(code) => write!(f, "{code}"),
            ErrorCode::Bind => f.write_str("bind"),
            ErrorCode::Unbind => f.write_str("unbind"),
        }
    }
}

/// What a decoder may know about the PDU it decodes.
#[derive(Debug, Clone, Copy)]
pub struct SessionHandle<'a> {
    pub conversation: &'a ConversationKey,
    pub direction: DirectionHint,
    pub frame: FrameNumber,
}

/// Consumes a prefix of a PDU body and reports how many bytes it used.
/// Returning 0 for a non-empty body means the decoder is stuck.
pub trait Decoder: Send + Sync {
    fn decode(&self, body: &[u8], session: &SessionHandle<'_>) -> usize;
}

impl<F> Decoder for F
where
    F: Fn(&[u8], &SessionHandle<'_>) -> usize + Send + Sync,
{
    fn decode(&self, body: &[u8], session: &SessionHandle<'_>) -> usize {
        self(body, session)
    }
}

/// Takes the whole body as one opaque span.
#[derive(Debug, Clone, Copy, Default)]
pub struct Opaque;

impl Decoder for Opaque {
    fn decode(&self, body: &[u8], _session: &SessionHandle<'_>) -> usize {
        body.len()
    }
}

struct OperationEntry {
    name: String,
    argument: Arc<dyn Decoder>,
    result: Arc<dyn Decoder>,
}

struct ErrorEntry {
    name: String,
    decoder: Arc<dyn Decoder>,
}

/// Tables one protocol module contributes.
pub struct ProtocolRegistration {
    name: String,
    operations: Vec<(OpCode, OperationEntry)>,
    errors: Vec<(ErrorCode, ErrorEntry)>,
}

impl ProtocolRegistration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn operation(
        mut self,
        code: OpCode,
        name: impl Into<String>,
        argument: impl Decoder + 'static,
        result: impl Decoder + 'static,
    ) -> Self {
        self.operations.push((
            code,
            OperationEntry {
                name: name.into(),
                argument: Arc::new(argument),
                result: Arc::new(result),
            },
        ));
        self
    }

    pub fn error(
        mut self,
        code: ErrorCode,
        name: impl Into<String>,
        decoder: impl Decoder + 'static,
    ) -> Self {
        self.errors.push((
            code,
            ErrorEntry {
                name: name.into(),
                decoder: Arc::new(decoder),
            },
        ));
        self
    }
}

struct ProtocolTable {
    name: String,
    operations: HashMap<OpCode, OperationEntry>,
    errors: HashMap<ErrorCode, ErrorEntry>,
}

/// Mutable registration phase.
#[derive(Default)]
pub struct RegistryBuilder {
    protocols: HashMap<String, ProtocolTable>,
    generic: HashMap<String, Arc<dyn Decoder>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        protocol_id: impl Into<String>,
        registration: ProtocolRegistration,
    ) -> Result<(), RegistryError> {
        let protocol = protocol_id.into();
        if self.protocols.contains_key(&protocol) {
            return Err(RegistryError::DuplicateProtocol { protocol });
        }

        let mut operations = HashMap::with_capacity(registration.operations.len());
        for (code, entry) in registration.operations {
            if operations.insert(code, entry).is_some() {
                return Err(RegistryError::DuplicateOperation { protocol, code });
            }
        }
        let mut errors = HashMap::with_capacity(registration.errors.len());
        for (code, entry) in registration.errors {
            if errors.insert(code, entry).is_some() {
                return Err(RegistryError::DuplicateError { protocol, code });
            }
        }

        self.protocols.insert(
            protocol,
            ProtocolTable {
                name: registration.name,
                operations,
                errors,
            },
        );
        Ok(())
    }

    /// Fallback decoder keyed by protocol identifier alone.
    pub fn register_generic(
        &mut self,
        protocol_id: impl Into<String>,
        decoder: impl Decoder + 'static,
    ) -> Result<(), RegistryError> {
        let protocol = protocol_id.into();
        if self.generic.contains_key(&protocol) {
            return Err(RegistryError::DuplicateGeneric { protocol });
        }
        self.generic.insert(protocol, Arc::new(decoder));
        Ok(())
    }

    pub fn build(self) -> Registry {
        Registry {
            protocols: self.protocols,
            generic: self.generic,
        }
    }
}

/// Frozen registry, safe to share across threads.
pub struct Registry {
    protocols: HashMap<String, ProtocolTable>,
    generic: HashMap<String, Arc<dyn Decoder>>,
}

impl Registry {
    pub fn resolve(&self, protocol_id: &str, code: i32, kind: MessageKind) -> Option<&dyn Decoder> {
        let table = self.protocols.get(protocol_id)?;
        if let Some(op) = kind.op_code(code) {
            let entry = table.operations.get(&op)?;
            let decoder = if kind.is_argument() {
                &entry.argument
            } else {
                &entry.result
            };
            return Some(decoder.as_ref());
        }
        let err = kind.error_code(code)?;
        table.errors.get(&err).map(|entry| entry.decoder.as_ref())
    }

    pub fn generic(&self, protocol_id: &str) -> Option<&dyn Decoder> {
        self.generic.get(protocol_id).map(|decoder| decoder.as_ref())
    }

    pub fn contains(&self, protocol_id: &str) -> bool {
        self.protocols.contains_key(protocol_id)
    }

    /// Display name of a registered protocol.
    pub fn protocol_name(&self, protocol_id: &str) -> Option<&str> {
        self.protocols
            .get(protocol_id)
            .map(|table| table.name.as_str())
    }

    /// Name of the operation or error a message refers to.
    pub fn name(&self, protocol_id: &str, code: i32, kind: MessageKind) -> Option<&str> {
        let table = self.protocols.get(protocol_id)?;
        if let Some(op) = kind.op_code(code) {
            return table.operations.get(&op).map(|entry| entry.name.as_str());
        }
        let err = kind.error_code(code)?;
        table.errors.get(&err).map(|entry| entry.name.as_str())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut protocols: Vec<&String> = self.protocols.keys().collect();
        protocols.sort();
        let mut generic: Vec<&String> = self.generic.keys().collect();
        generic.sort();
        f.debug_struct("Registry")
            .field("protocols", &protocols)
            .field("generic", &generic)
            .finish()
    }
}
