//! Message envelope classification.
//!
//! Every frame on the link carries a JSON envelope whose `"type"` field
//! names one of the message kinds below. The envelope text itself is kept
//! opaque: a [`Message`] holds the raw payload alongside its classified
//! kind and timestamp, and is consumed immediately on dispatch.

use crate::streaming::wire::DecodeError;
use serde_json::Value;

/// Message kinds carried on the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Sensor reading from the node
    SensorData,
    /// Command to the node
    Command,
    /// Command acknowledgment from the node
    Response,
    /// Liveness frame from the node
    Heartbeat,
    /// Error report from the peer
    Error,
}

impl MessageKind {
    /// Parse the wire `"type"` string
    pub fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "sensor_data" => Some(Self::SensorData),
            "command" => Some(Self::Command),
            "response" => Some(Self::Response),
            "heartbeat" => Some(Self::Heartbeat),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Wire `"type"` string for this kind
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::SensorData => "sensor_data",
            Self::Command => "command",
            Self::Response => "response",
            Self::Heartbeat => "heartbeat",
            Self::Error => "error",
        }
    }
}

/// One classified frame payload
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageKind,
    /// Raw envelope text as received or built
    pub payload: String,
    /// Envelope timestamp in milliseconds, 0 when absent
    pub timestamp: u64,
}

impl Message {
    /// Wrap an already-encoded command payload
    pub fn command(payload: String) -> Self {
        Self {
            kind: MessageKind::Command,
            payload,
            timestamp: 0,
        }
    }

    /// Classify an incoming envelope by its `"type"` field
    pub fn from_payload(text: &str) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

        let kind_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::MalformedPayload("missing \"type\" field".to_string()))?;

        let kind = MessageKind::from_wire(kind_name)
            .ok_or_else(|| DecodeError::UnknownKind(kind_name.to_string()))?;

        let timestamp = value.get("timestamp").and_then(Value::as_u64).unwrap_or(0);

        Ok(Self {
            kind,
            payload: text.to_string(),
            timestamp,
        })
    }
}
