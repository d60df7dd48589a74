//! TCP telemetry client for a remote sensor node.
//!
//! The client owns the socket and the connection state machine. The only
//! blocking operation is the connect handshake inside [`TelemetryClient::connect`];
//! all session I/O afterwards is non-blocking and must be polled by calling
//! [`TelemetryClient::drain_incoming`] from the driver's own loop, once per
//! tick.
//!
//! # Connection Lifecycle
//!
//! ```text
//! Disconnected → Connecting → Connected → {Disconnected, Error}
//! ```
//!
//! `Error` is non-terminal: a later `connect()` retries from it. The client
//! never reconnects on its own; reconnection policy belongs to the external
//! driver.
//!
//! # Callbacks
//!
//! Reading and state-change handlers are plain `FnMut` values invoked
//! inline, on the caller's own stack, during `connect`/`disconnect`/
//! `drain_incoming`. Long-blocking work inside a callback stalls the next
//! drain cycle.

use crate::core::types::{ConnectionState, SensorReading};
use crate::error::{Error, Result};
use crate::streaming::messages::{Message, MessageKind};
use crate::streaming::wire::{self, DecodeError, HEADER_LEN, MAX_FRAME_LEN};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

/// Handler invoked once per successfully decoded sensor reading
pub type ReadingCallback = Box<dyn FnMut(&SensorReading) + Send>;
/// Handler invoked at the point of each state transition
pub type StateCallback = Box<dyn FnMut(ConnectionState) + Send>;

/// TCP client session for the telemetry link
pub struct TelemetryClient {
    stream: Option<TcpStream>,
    state: ConnectionState,
    /// Most recent diagnostic; overwritten on each failure, never cleared on success
    last_error: String,
    /// Most recently decoded reading, cached for pull-style consumers
    latest: SensorReading,
    /// Wall-clock milliseconds of the last decoded reading
    last_reading_ms: Option<u64>,
    on_reading: Option<ReadingCallback>,
    on_state_change: Option<StateCallback>,
}

impl TelemetryClient {
    /// Create a disconnected client
    pub fn new() -> Self {
        Self {
            stream: None,
            state: ConnectionState::Disconnected,
            last_error: String::new(),
            latest: SensorReading::default(),
            last_reading_ms: None,
            on_reading: None,
            on_state_change: None,
        }
    }

    /// Connect to a sensor node.
    ///
    /// An established session is disconnected first (no silent no-op). The
    /// handshake blocks; on success the socket is switched to non-blocking
    /// mode for all subsequent I/O. Any failure abandons the attempt:
    /// the socket is released, the state becomes `Error`, and a diagnostic
    /// is recorded.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        if self.state == ConnectionState::Connected {
            self.disconnect();
        }

        self.set_state(ConnectionState::Connecting);

        let stream = match TcpStream::connect((host, port)) {
            Ok(stream) => stream,
            Err(e) => {
                self.last_error = format!("connection to {}:{} failed: {}", host, port, e);
                self.set_state(ConnectionState::Error);
                return Err(Error::Io(e));
            }
        };

        if let Err(e) = stream.set_nonblocking(true) {
            self.last_error = format!("failed to set non-blocking mode: {}", e);
            let _ = stream.shutdown(Shutdown::Both);
            self.set_state(ConnectionState::Error);
            return Err(Error::Io(e));
        }

        log::info!("connected to sensor node at {}:{}", host, port);
        self.stream = Some(stream);
        self.set_state(ConnectionState::Connected);
        Ok(())
    }

    /// Disconnect the session.
    ///
    /// Idempotent; forces `Disconnected` even from the `Error` state.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Most recent diagnostic string.
    ///
    /// Overwritten on each new failure and never cleared automatically;
    /// compare against [`TelemetryClient::state`] to detect recovery.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// Most recently decoded reading (invalid default until one arrives)
    pub fn latest_reading(&self) -> &SensorReading {
        &self.latest
    }

    /// Wall-clock milliseconds of the last decoded reading
    pub fn last_reading_ms(&self) -> Option<u64> {
        self.last_reading_ms
    }

    /// Register the sensor reading handler
    pub fn set_on_reading<F>(&mut self, callback: F)
    where
        F: FnMut(&SensorReading) + Send + 'static,
    {
        self.on_reading = Some(Box::new(callback));
    }

    /// Register the connection state handler
    pub fn set_on_state_change<F>(&mut self, callback: F)
    where
        F: FnMut(ConnectionState) + Send + 'static,
    {
        self.on_state_change = Some(Box::new(callback));
    }

    /// Send one framed message.
    ///
    /// Fails immediately when not connected. The payload is written after
    /// its 4-byte length prefix, looping until fully flushed; a hard socket
    /// error records the diagnostic and returns it without changing the
    /// connection state (a dead peer is detected on the next drain).
    pub fn send_message(&mut self, message: &Message) -> Result<()> {
        if self.state != ConnectionState::Connected {
            self.last_error = "not connected".to_string();
            return Err(Error::NotConnected);
        }

        let payload = message.payload.as_bytes();
        if payload.len() > MAX_FRAME_LEN {
            self.last_error = format!("frame too large: {} bytes", payload.len());
            return Err(Error::FrameTooLarge(payload.len()));
        }

        let frame = wire::encode_frame(payload);
        let outcome = match self.stream.as_mut() {
            Some(stream) => write_frame(stream, &frame),
            None => {
                self.last_error = "not connected".to_string();
                return Err(Error::NotConnected);
            }
        };

        if let Err(e) = outcome {
            self.last_error = format!("send failed: {}", e);
            return Err(Error::Io(e));
        }
        Ok(())
    }

    /// Request an immediate sensor reading from the node
    pub fn request_sensor_data(&mut self) -> Result<()> {
        let payload = wire::encode_command("get_sensor_data", None);
        self.send_message(&Message::command(payload))
    }

    /// Ask the node to change its publish interval
    pub fn set_sampling_rate(&mut self, rate_ms: u32) -> Result<()> {
        let params = format!("{{\"rate_ms\":{}}}", rate_ms);
        let payload = wire::encode_command("set_sampling_rate", Some(&params));
        self.send_message(&Message::command(payload))
    }

    /// Drain and dispatch all currently available frames.
    ///
    /// Non-blocking; call once per driver tick. The loop ends when no more
    /// bytes are pending (`WouldBlock`, the normal case). A zero-byte read
    /// on the length prefix means the peer closed: the session disconnects
    /// and the state callback fires once. A partial length prefix or a
    /// short payload records an error and ends this drain, keeping the
    /// connection for the next tick. An announced frame length over
    /// [`MAX_FRAME_LEN`] drops the link, since the byte stream cannot be
    /// resynchronized past a garbage header. Decode failures drop only the
    /// offending frame.
    ///
    /// Returns the number of frames successfully decoded and dispatched.
    pub fn drain_incoming(&mut self) -> usize {
        if self.state != ConnectionState::Connected {
            return 0;
        }

        let mut processed = 0;
        loop {
            let mut len_buf = [0u8; HEADER_LEN];
            let header = match self.stream.as_mut() {
                Some(stream) => stream.read(&mut len_buf),
                None => break,
            };
            match header {
                Ok(0) => {
                    self.last_error = "connection closed by peer".to_string();
                    log::info!("sensor node closed the connection");
                    self.disconnect();
                    break;
                }
                Ok(n) if n == HEADER_LEN => {}
                Ok(_) => {
                    self.last_error = "invalid message length header".to_string();
                    break;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.last_error = format!("receive error: {}", e);
                    break;
                }
            }

            let len = u32::from_be_bytes(len_buf) as usize;
            if len > MAX_FRAME_LEN {
                self.last_error = format!("frame too large: {} bytes", len);
                log::warn!("dropping link: oversized frame announced ({} bytes)", len);
                self.disconnect();
                break;
            }

            let mut payload = vec![0u8; len];
            let body = match self.stream.as_mut() {
                Some(stream) => read_payload(stream, &mut payload),
                None => break,
            };
            if let Err(e) = body {
                self.last_error = format!("failed to receive payload: {}", e);
                break;
            }

            match self.dispatch_payload(&payload) {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(e) => {
                    self.last_error = format!("dropped frame: {}", e);
                    log::warn!("dropped frame: {}", e);
                }
            }
        }

        processed
    }

    /// Decode one payload and dispatch it to the matching handler.
    ///
    /// Returns `Ok(true)` when the frame was dispatched, `Ok(false)` when
    /// it decoded but carried nothing to deliver.
    fn dispatch_payload(&mut self, payload: &[u8]) -> std::result::Result<bool, DecodeError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;
        let message = Message::from_payload(text)?;

        match message.kind {
            MessageKind::SensorData => {
                let reading = wire::decode_reading_payload(&message.payload)?;
                if !reading.valid {
                    log::debug!("sensor_data frame carried no recognized fields");
                    return Ok(false);
                }
                self.latest = reading;
                self.last_reading_ms = Some(super::wall_clock_ms());
                if let Some(callback) = self.on_reading.as_mut() {
                    callback(&reading);
                }
                Ok(true)
            }
            MessageKind::Heartbeat => {
                log::debug!("heartbeat from sensor node (t={})", message.timestamp);
                Ok(true)
            }
            MessageKind::Response => {
                log::debug!("node response: {}", message.payload);
                Ok(true)
            }
            MessageKind::Error => {
                log::warn!("error frame from peer: {}", message.payload);
                Ok(true)
            }
            MessageKind::Command => {
                log::warn!("unexpected command frame from peer");
                Ok(true)
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            self.state = state;
            if let Some(callback) = self.on_state_change.as_mut() {
                callback(state);
            }
        }
    }
}

impl Default for TelemetryClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a full frame, retrying through `WouldBlock` until flushed
fn write_frame(stream: &mut TcpStream, frame: &[u8]) -> std::io::Result<()> {
    let mut written = 0;
    while written < frame.len() {
        match stream.write(&frame[written..]) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    ErrorKind::WriteZero,
                    "socket closed during send",
                ));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Read an announced payload to completion.
///
/// `WouldBlock` before the payload is complete fails the frame: the drain
/// reports a short payload rather than stalling the caller's loop.
fn read_payload(stream: &mut TcpStream, buf: &mut [u8]) -> std::io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "peer closed mid-payload",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::wire::encode_frame;
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    fn listen() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn settle() {
        thread::sleep(Duration::from_millis(150));
    }

    #[test]
    fn test_drain_when_disconnected_returns_zero() {
        let mut client = TelemetryClient::new();
        assert_eq!(client.drain_incoming(), 0);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_drain_without_data_returns_zero() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();
        client.connect("127.0.0.1", port).unwrap();
        let _server = listener.accept().unwrap().0;

        assert_eq!(client.drain_incoming(), 0);
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_send_requires_connection() {
        let mut client = TelemetryClient::new();
        let result = client.request_sensor_data();
        assert!(matches!(result, Err(Error::NotConnected)));
        assert_eq!(client.last_error(), "not connected");
    }

    #[test]
    fn test_connect_failure_enters_error_state() {
        // Bind then drop to get a port with no listener
        let (listener, port) = listen();
        drop(listener);

        let states = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&states);

        let mut client = TelemetryClient::new();
        client.set_on_state_change(move |state| seen.lock().unwrap().push(state));

        assert!(client.connect("127.0.0.1", port).is_err());
        assert_eq!(client.state(), ConnectionState::Error);
        assert!(client.last_error().contains("failed"));
        assert_eq!(
            *states.lock().unwrap(),
            vec![ConnectionState::Connecting, ConnectionState::Error]
        );

        // disconnect() bypasses Error
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_request_sensor_data_wire_bytes() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();
        client.connect("127.0.0.1", port).unwrap();
        let mut server = listener.accept().unwrap().0;

        client.request_sensor_data().unwrap();

        let expected = r#"{"type":"command","cmd":"get_sensor_data"}"#;
        let mut len_buf = [0u8; 4];
        server.read_exact(&mut len_buf).unwrap();
        assert_eq!(len_buf, (expected.len() as u32).to_be_bytes());

        let mut payload = vec![0u8; expected.len()];
        server.read_exact(&mut payload).unwrap();
        assert_eq!(payload, expected.as_bytes());
    }

    #[test]
    fn test_set_sampling_rate_wire_bytes() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();
        client.connect("127.0.0.1", port).unwrap();
        let mut server = listener.accept().unwrap().0;

        client.set_sampling_rate(250).unwrap();

        let expected = r#"{"type":"command","cmd":"set_sampling_rate","params":{"rate_ms":250}}"#;
        let mut len_buf = [0u8; 4];
        server.read_exact(&mut len_buf).unwrap();
        assert_eq!(len_buf, (expected.len() as u32).to_be_bytes());

        let mut payload = vec![0u8; expected.len()];
        server.read_exact(&mut payload).unwrap();
        assert_eq!(payload, expected.as_bytes());
    }

    #[test]
    fn test_sensor_frame_dispatches_callback_once() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();

        let readings = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&readings);
        client.set_on_reading(move |reading| seen.lock().unwrap().push(*reading));

        client.connect("127.0.0.1", port).unwrap();
        let mut server = listener.accept().unwrap().0;

        let payload = concat!(
            r#"{"type":"sensor_data","timestamp":1700000000000,"#,
            r#""data":{"temperature":24.5,"humidity":60.0,"pressure":1010.0,"#,
            r#""light":80.0,"motion_detected":true,"cpu_usage":20.0,"memory_usage":45.0}}"#
        );
        server.write_all(&encode_frame(payload.as_bytes())).unwrap();
        settle();

        assert_eq!(client.drain_incoming(), 1);
        let readings = readings.lock().unwrap();
        assert_eq!(readings.len(), 1);
        assert!(readings[0].valid);
        assert!(readings[0].motion_detected);
        assert!((readings[0].temperature - 24.5).abs() < 1e-4);
        assert!(client.latest_reading().valid);
        assert!(client.last_reading_ms().is_some());
    }

    #[test]
    fn test_heartbeat_counts_without_reading_callback() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();

        let readings = Arc::new(Mutex::new(0u32));
        let seen = Arc::clone(&readings);
        client.set_on_reading(move |_| *seen.lock().unwrap() += 1);

        client.connect("127.0.0.1", port).unwrap();
        let mut server = listener.accept().unwrap().0;

        let payload = r#"{"type":"heartbeat","timestamp":12345}"#;
        server.write_all(&encode_frame(payload.as_bytes())).unwrap();
        settle();

        assert_eq!(client.drain_incoming(), 1);
        assert_eq!(*readings.lock().unwrap(), 0);
        assert!(!client.latest_reading().valid);
    }

    #[test]
    fn test_malformed_frame_dropped_connection_kept() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();
        client.connect("127.0.0.1", port).unwrap();
        let mut server = listener.accept().unwrap().0;

        server.write_all(&encode_frame(b"not json")).unwrap();
        // A good frame behind the bad one still goes through this drain
        let good = r#"{"type":"heartbeat","timestamp":1}"#;
        server.write_all(&encode_frame(good.as_bytes())).unwrap();
        settle();

        assert_eq!(client.drain_incoming(), 1);
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(client.last_error().contains("dropped frame"));
    }

    #[test]
    fn test_peer_close_disconnects_with_single_callback() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();
        client.connect("127.0.0.1", port).unwrap();

        let states = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&states);
        client.set_on_state_change(move |state| seen.lock().unwrap().push(state));

        let server = listener.accept().unwrap().0;
        drop(server);
        settle();

        assert_eq!(client.drain_incoming(), 0);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(*states.lock().unwrap(), vec![ConnectionState::Disconnected]);
        assert_eq!(client.last_error(), "connection closed by peer");
    }

    #[test]
    fn test_frames_before_peer_close_are_counted() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();
        client.connect("127.0.0.1", port).unwrap();
        let mut server = listener.accept().unwrap().0;

        let payload = r#"{"type":"heartbeat","timestamp":7}"#;
        server.write_all(&encode_frame(payload.as_bytes())).unwrap();
        drop(server);
        settle();

        assert_eq!(client.drain_incoming(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_reconnect_performs_single_state_cycle() {
        let (listener_a, port_a) = listen();
        let (listener_b, port_b) = listen();

        let states = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&states);

        let mut client = TelemetryClient::new();
        client.set_on_state_change(move |state| seen.lock().unwrap().push(state));

        client.connect("127.0.0.1", port_a).unwrap();
        let _server_a = listener_a.accept().unwrap().0;
        client.connect("127.0.0.1", port_b).unwrap();
        let _server_b = listener_b.accept().unwrap().0;

        assert_eq!(
            *states.lock().unwrap(),
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Connected,
            ]
        );
    }

    #[test]
    fn test_partial_header_records_error_keeps_connection() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();
        client.connect("127.0.0.1", port).unwrap();
        let mut server = listener.accept().unwrap().0;

        server.write_all(&[0x00, 0x00]).unwrap();
        server.shutdown(Shutdown::Write).unwrap();
        settle();

        assert_eq!(client.drain_incoming(), 0);
        assert_eq!(client.last_error(), "invalid message length header");
        assert_eq!(client.state(), ConnectionState::Connected);

        // The next tick observes the close
        assert_eq!(client.drain_incoming(), 0);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_oversized_frame_drops_link() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();
        client.connect("127.0.0.1", port).unwrap();
        let mut server = listener.accept().unwrap().0;

        let announced = (2 * MAX_FRAME_LEN as u32).to_be_bytes();
        server.write_all(&announced).unwrap();
        settle();

        assert_eq!(client.drain_incoming(), 0);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.last_error().contains("too large"));
    }

    #[test]
    fn test_short_payload_records_error_keeps_connection() {
        let (listener, port) = listen();
        let mut client = TelemetryClient::new();
        client.connect("127.0.0.1", port).unwrap();
        let mut server = listener.accept().unwrap().0;

        // Announce 10 bytes, deliver 3, keep the socket open
        server.write_all(&10u32.to_be_bytes()).unwrap();
        server.write_all(b"abc").unwrap();
        settle();

        assert_eq!(client.drain_incoming(), 0);
        assert!(client.last_error().contains("failed to receive payload"));
        assert_eq!(client.state(), ConnectionState::Connected);
    }
}
