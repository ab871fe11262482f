//! Analysis configuration.
//!
//! Which ports carry which protocol, the application context ROS payloads
//! are dispatched under, and how many out-of-order TCP segments a stream
//! direction may hold before its gap is skipped. Every field has a default,
//! so an empty JSON object is a valid configuration.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocols::{ProtocolKind, ros, wow};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// TCP server ports carrying ROS over TPKT.
    pub ros_ports: Vec<u16>,
    /// Registry key for ROS argument and result decoding.
    pub ros_context: String,
    /// TCP server ports carrying the WoW authentication protocol.
    pub wow_ports: Vec<u16>,
    /// UDP server ports carrying one ROS APDU per datagram.
    pub udp_ros_ports: Vec<u16>,
    pub max_out_of_order_segments: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ros_ports: vec![ros::layout::DEFAULT_TCP_PORT],
            ros_context: ros::layout::DEFAULT_CONTEXT.to_string(),
            wow_ports: vec![wow::layout::DEFAULT_TCP_PORT],
            udp_ros_ports: Vec::new(),
            max_out_of_order_segments: 64,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_out_of_order_segments == 0 {
            return Err(ConfigError::Invalid(
                "max_out_of_order_segments must be at least 1".to_string(),
            ));
        }
        if !is_dotted_oid(&self.ros_context) {
            return Err(ConfigError::Invalid(format!(
                "ros_context {:?} is not a dotted object identifier",
                self.ros_context
            )));
        }

        let mut tcp = HashSet::new();
        for &port in self.ros_ports.iter().chain(&self.wow_ports) {
            if port == 0 {
                return Err(ConfigError::Invalid("port 0 is not a server port".to_string()));
            }
            if !tcp.insert(port) {
                return Err(ConfigError::Invalid(format!(
                    "TCP port {port} is assigned to more than one protocol"
                )));
            }
        }
        if self.udp_ros_ports.contains(&0) {
            return Err(ConfigError::Invalid("port 0 is not a server port".to_string()));
        }
        Ok(())
    }

    fn protocol_on(&self, transport: Transport, port: u16) -> Option<ProtocolKind> {
        match transport {
            Transport::Tcp if self.ros_ports.contains(&port) => Some(ProtocolKind::RosTpkt),
            Transport::Tcp if self.wow_ports.contains(&port) => Some(ProtocolKind::Wow),
            Transport::Udp if self.udp_ros_ports.contains(&port) => Some(ProtocolKind::RosDatagram),
            _ => None,
        }
    }

    /// Protocol and server port for a segment. The destination port wins
    /// when both ends use configured ports.
    pub fn protocol_for(
        &self,
        transport: Transport,
        src_port: u16,
        dst_port: u16,
    ) -> Option<(ProtocolKind, u16)> {
        self.protocol_on(transport, dst_port)
            .map(|kind| (kind, dst_port))
            .or_else(|| {
                self.protocol_on(transport, src_port)
                    .map(|kind| (kind, src_port))
            })
    }
}

fn is_dotted_oid(value: &str) -> bool {
    !value.is_empty()
        && value
            .split('.')
            .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()))
}
