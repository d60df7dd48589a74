//! Wire format for the telemetry link
//!
//! # TCP Protocol Specification
//!
//! setu-link uses a length-prefixed framing protocol for all TCP
//! communication:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ UTF-8 JSON text          │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! ## Framing
//!
//! - **Length field**: 4-byte big-endian unsigned integer
//! - **Payload**: JSON envelope text, UTF-8
//! - **Maximum frame size**: 1MB (1,048,576 bytes)
//! - **Byte order**: Network byte order (big-endian) for length prefix
//!
//! ## Payload Shapes
//!
//! Command (client → node):
//!
//! ```text
//! {"type":"command","cmd":"<name>"[,"params":<json>]}
//! ```
//!
//! Sensor data (node → client):
//!
//! ```text
//! {"type":"sensor_data","timestamp":<ms>,"data":{"temperature":f,...}}
//! ```
//!
//! ## Decoding Leniency
//!
//! Sensor payloads are scanned for known field names rather than
//! deserialized into a rigid shape: fields may appear in any order, missing
//! fields stay at their defaults, unknown fields are ignored. A reading
//! with at least one recognized field is marked valid; a reading with none
//! is returned invalid. A recognized field holding the wrong JSON type
//! fails the whole frame with [`DecodeError::MalformedField`] and the
//! caller drops it. Partially populated readings stay usable downstream.

use crate::core::types::SensorReading;
use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;

/// Maximum payload size accepted on either direction of the link
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Length prefix size in bytes
pub const HEADER_LEN: usize = 4;

/// Wire codec decode failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Payload is not valid JSON text
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A recognized field is present but holds the wrong type
    #[error("malformed field: {0}")]
    MalformedField(&'static str),

    /// Envelope carries an unrecognized message type
    #[error("unknown message type: {0}")]
    UnknownKind(String),
}

/// Prefix a payload with its length as a 4-byte big-endian integer
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Build a command envelope.
///
/// `params`, when present, must already be valid JSON; it is inserted
/// verbatim with no escaping or re-serialization.
pub fn encode_command(name: &str, params: Option<&str>) -> String {
    let mut payload = format!("{{\"type\":\"command\",\"cmd\":\"{}\"", name);
    if let Some(params) = params {
        payload.push_str(",\"params\":");
        payload.push_str(params);
    }
    payload.push('}');
    payload
}

#[derive(Serialize)]
struct ReadingEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: u64,
    data: &'a SensorReading,
}

/// Build a sensor-data envelope for a node that sends readings.
///
/// The `valid` flag is not serialized; the wire shape carries only the
/// seven data fields.
pub fn encode_reading(reading: &SensorReading, timestamp_ms: u64) -> Result<String> {
    let envelope = ReadingEnvelope {
        kind: "sensor_data",
        timestamp: timestamp_ms,
        data: reading,
    };
    serde_json::to_string(&envelope).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a sensor-data payload into a reading.
///
/// Scans the `"data"` object (or the payload root when no `"data"` object
/// exists) for the known field names. See the module docs for the leniency
/// rules.
pub fn decode_reading_payload(text: &str) -> std::result::Result<SensorReading, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let fields = match value.get("data").and_then(Value::as_object) {
        Some(data) => Some(data),
        None => value.as_object(),
    };

    let mut reading = SensorReading::default();
    let Some(fields) = fields else {
        // Valid JSON but nothing to scan: an empty (invalid) reading
        return Ok(reading);
    };

    let mut found = false;
    if let Some(v) = fields.get("temperature") {
        reading.temperature = float_field(v, "temperature")?;
        found = true;
    }
    if let Some(v) = fields.get("humidity") {
        reading.humidity = float_field(v, "humidity")?;
        found = true;
    }
    if let Some(v) = fields.get("pressure") {
        reading.pressure = float_field(v, "pressure")?;
        found = true;
    }
    if let Some(v) = fields.get("light") {
        reading.light = float_field(v, "light")?;
        found = true;
    }
    if let Some(v) = fields.get("motion_detected") {
        reading.motion_detected = v
            .as_bool()
            .ok_or(DecodeError::MalformedField("motion_detected"))?;
        found = true;
    }
    if let Some(v) = fields.get("cpu_usage") {
        reading.cpu_usage = float_field(v, "cpu_usage")?;
        found = true;
    }
    if let Some(v) = fields.get("memory_usage") {
        reading.memory_usage = float_field(v, "memory_usage")?;
        found = true;
    }

    reading.valid = found;
    Ok(reading)
}

fn float_field(value: &Value, name: &'static str) -> std::result::Result<f32, DecodeError> {
    value
        .as_f64()
        .map(|f| f as f32)
        .ok_or(DecodeError::MalformedField(name))
}
