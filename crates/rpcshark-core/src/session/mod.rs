//! Session Store: one state container per logical connection.
//!
//! Sessions are keyed by a canonical [`ConversationKey`] so both directions
//! of a connection land in the same session. They are created lazily on the
//! first PDU or segment and live until the caller removes them or drains the
//! store at end of capture.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use crate::correlation::Correlator;
use crate::framing::{DirectionHint, StreamBuffer};
use crate::protocols::ProtocolKind;
use crate::transport::{SegmentOrdering, Transport};

/// Connection tuple with endpoints in sorted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey {
    pub transport: Transport,
    lower: SocketAddr,
    upper: SocketAddr,
}

/// Which way a packet flows relative to the canonical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the lower endpoint to the upper one.
    Forward,
    Reverse,
}

impl Direction {
    fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }
}

impl ConversationKey {
    pub fn new(transport: Transport, a: SocketAddr, b: SocketAddr) -> Self {
        let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
        Self {
            transport,
            lower,
            upper,
        }
    }

    pub fn lower(&self) -> SocketAddr {
        self.lower
    }

    pub fn upper(&self) -> SocketAddr {
        self.upper
    }

    pub fn direction_of(&self, src: SocketAddr) -> Direction {
        if src == self.lower {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// The endpoint opposite to `endpoint`.
    pub fn peer_of(&self, endpoint: SocketAddr) -> SocketAddr {
        if endpoint == self.lower {
            self.upper
        } else {
            self.lower
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} <-> {}", self.transport, self.lower, self.upper)
    }
}

/// How a new session is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProfile {
    pub protocol: ProtocolKind,
    pub server: SocketAddr,
    pub max_out_of_order_segments: usize,
}

/// Ordering and framing state of one stream direction.
#[derive(Debug)]
pub struct DirectionState {
    pub ordering: SegmentOrdering,
    pub buffer: StreamBuffer,
}

impl DirectionState {
    fn new(max_held: usize) -> Self {
        Self {
            ordering: SegmentOrdering::new(max_held),
            buffer: StreamBuffer::new(),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub key: ConversationKey,
    pub protocol: ProtocolKind,
    pub server: SocketAddr,
    pub correlator: Correlator,
    streams: [DirectionState; 2],
    pub frames: u64,
    pub pdus: u64,
}

impl Session {
    fn new(key: ConversationKey, profile: SessionProfile) -> Self {
        let max = profile.max_out_of_order_segments;
        Self {
            key,
            protocol: profile.protocol,
            server: profile.server,
            correlator: Correlator::new(),
            streams: [DirectionState::new(max), DirectionState::new(max)],
            frames: 0,
            pdus: 0,
        }
    }

    pub fn client(&self) -> SocketAddr {
        self.key.peer_of(self.server)
    }

    pub fn hint_for(&self, src: SocketAddr) -> DirectionHint {
        if src == self.server {
            DirectionHint::ServerToClient
        } else {
            DirectionHint::ClientToServer
        }
    }

    pub fn stream(&mut self, direction: Direction) -> &mut DirectionState {
        &mut self.streams[direction.index()]
    }

    /// Both directions, forward first.
    pub fn streams_mut(&mut self) -> impl Iterator<Item = (Direction, &mut DirectionState)> {
        [Direction::Forward, Direction::Reverse]
            .into_iter()
            .zip(self.streams.iter_mut())
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<ConversationKey, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the session for `key`, creating it from `profile` on first use.
    /// An existing session keeps the profile it was created with.
    pub fn get_or_create(&mut self, key: ConversationKey, profile: SessionProfile) -> &mut Session {
        self.sessions
            .entry(key)
            .or_insert_with(|| Session::new(key, profile))
    }

    pub fn get(&self, key: &ConversationKey) -> Option<&Session> {
        self.sessions.get(key)
    }

    pub fn get_mut(&mut self, key: &ConversationKey) -> Option<&mut Session> {
        self.sessions.get_mut(key)
    }

    pub fn remove(&mut self, key: &ConversationKey) -> Option<Session> {
        self.sessions.remove(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Take every session out of the store, ordered by key.
    pub fn drain(&mut self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.drain().map(|(_, s)| s).collect();
        sessions.sort_by(|a, b| a.key.cmp(&b.key));
        sessions
    }
}
