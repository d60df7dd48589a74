//! Core data types for sensor readings and connection tracking.
//!
//! Key types for consumers:
//! - [`SensorReading`]: one decoded sample of sensor values
//! - [`ConnectionState`]: session state machine, owned by the client
//! - [`ConnectionStatus`]: derived per-tick status for display/bookkeeping
//! - [`SourceMode`]: which generator a [`crate::source::SensorSource`] draws from

use serde::{Deserialize, Serialize};

/// Connection state of a telemetry session.
///
/// Owned exclusively by the client; at most one state is authoritative at
/// any time. `Error` is non-terminal: a later `connect()` may retry from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// One sample of sensor values.
///
/// `valid == false` is the sentinel for "no usable data": the numeric
/// fields of an invalid reading carry no meaning and must not be plotted
/// or logged. The `valid` flag is never part of the wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorReading {
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub light: f32,
    pub motion_detected: bool,
    pub cpu_usage: f32,
    pub memory_usage: f32,
    #[serde(skip_serializing)]
    pub valid: bool,
}

impl Default for SensorReading {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            humidity: 0.0,
            pressure: 0.0,
            light: 0.0,
            motion_detected: false,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            valid: false,
        }
    }
}

impl SensorReading {
    /// Whether the reading carries usable data
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Reset all fields to defaults and mark the reading invalid
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Consumer-facing connection status, updated once per driver tick from the
/// session's [`ConnectionState`] and the wall clock of the last reading.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Wall-clock time (seconds) of the last successfully decoded reading
    pub last_data_time: f64,
    /// Driver-owned reconnect counter; zeroed on every transition into connected
    pub reconnect_attempts: u32,
    pub status_message: String,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            connected: false,
            last_data_time: 0.0,
            reconnect_attempts: 0,
            status_message: "Not connected".to_string(),
        }
    }
}

impl ConnectionStatus {
    /// Update from the current connection state and wall-clock time
    pub fn update(&mut self, connected: bool, now: f64) {
        self.connected = connected;
        if connected {
            self.status_message = "Connected to sensor node".to_string();
            self.last_data_time = now;
            self.reconnect_attempts = 0;
        } else {
            self.status_message = "Not connected - waiting for sensor node".to_string();
        }
    }

    /// Record one reconnect attempt by the external driver
    pub fn record_reconnect_attempt(&mut self) {
        self.reconnect_attempts += 1;
    }

    /// Reset to the initial disconnected status
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Which generator a sensor source draws readings from.
///
/// `Replay` is accepted by the API and config but currently yields only
/// invalid readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    Synthetic,
    LiveTransport,
    Replay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_default_is_invalid() {
        let reading = SensorReading::default();
        assert!(!reading.is_valid());
        assert_eq!(reading.temperature, 0.0);
        assert!(!reading.motion_detected);
    }

    #[test]
    fn test_reading_reset() {
        let mut reading = SensorReading {
            temperature: 23.5,
            humidity: 55.0,
            motion_detected: true,
            valid: true,
            ..Default::default()
        };
        reading.reset();
        assert_eq!(reading, SensorReading::default());
    }

    #[test]
    fn test_reading_wire_shape_excludes_valid() {
        let reading = SensorReading {
            temperature: 21.0,
            valid: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"temperature\""));
        assert!(!json.contains("valid"));
    }

    #[test]
    fn test_status_update_connected_resets_attempts() {
        let mut status = ConnectionStatus::default();
        status.record_reconnect_attempt();
        status.record_reconnect_attempt();
        assert_eq!(status.reconnect_attempts, 2);

        status.update(true, 12.5);
        assert!(status.connected);
        assert_eq!(status.reconnect_attempts, 0);
        assert_eq!(status.last_data_time, 12.5);
        assert!(status.status_message.contains("Connected"));
    }

    #[test]
    fn test_status_update_disconnected_keeps_attempts() {
        let mut status = ConnectionStatus::default();
        status.record_reconnect_attempt();
        status.update(false, 3.0);
        assert!(!status.connected);
        assert_eq!(status.reconnect_attempts, 1);
        assert_eq!(status.last_data_time, 0.0);
    }

    #[test]
    fn test_source_mode_config_names() {
        assert_eq!(
            serde_json::to_string(&SourceMode::LiveTransport).unwrap(),
            "\"live_transport\""
        );
        let mode: SourceMode = serde_json::from_str("\"synthetic\"").unwrap();
        assert_eq!(mode, SourceMode::Synthetic);
    }
}
