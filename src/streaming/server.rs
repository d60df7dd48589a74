//! Sensor node daemon serving the telemetry link.
//!
//! The serving peer of the protocol: accepts one client at a time, answers
//! framed commands, and publishes periodic sensor-data and heartbeat
//! frames.
//!
//! # Command Types
//!
//! | Command | Description |
//! |---------|-------------|
//! | `get_sensor_data` | Publish one reading immediately |
//! | `set_sampling_rate` | Change the publish interval (clamped 100-10000ms) |
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. Client connects to the bind address (default port 8080)
//! 2. Per-client loop serves commands until disconnect
//! 3. Sensor-data frames go out every sampling interval
//! 4. Heartbeat frames go out every heartbeat interval (0 disables)
//! 5. On disconnect, the accept loop waits for the next client
//! ```
//!
//! # Safety Features
//!
//! - **Read timeout**: 50ms timeout keeps publishing responsive and allows
//!   periodic shutdown flag checks
//! - **Buffer limit**: command frames over 1MB drop the client

use crate::config::{AppConfig, SamplingConfig};
use crate::error::{Error, Result};
use crate::source::{system, SensorSource};
use crate::streaming::messages::{Message, MessageKind};
use crate::streaming::wire::{self, DecodeError, HEADER_LEN, MAX_FRAME_LEN};
use serde_json::Value;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Initial capacity for the command read buffer (typical command size)
const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Per-read timeout; bounds command latency and shutdown response
const READ_TIMEOUT_MS: u64 = 50;

/// Accept-loop poll interval when no connection is pending
const ACCEPT_POLL_MS: u64 = 50;

/// Sampling rate bounds accepted from clients
const MIN_RATE_MS: u64 = 100;
const MAX_RATE_MS: u64 = 10_000;

/// TCP sensor node daemon
pub struct SensorServer {
    listener: TcpListener,
    source: SensorSource,
    sampling: SamplingConfig,
    overlay_system_metrics: bool,
    running: Arc<AtomicBool>,
    /// Reusable buffer for reading command payloads (avoids allocation per command)
    read_buffer: Vec<u8>,
}

impl SensorServer {
    /// Bind the listen socket.
    ///
    /// Readings come from `source`; the daemon publishes whatever mode the
    /// source is in (synthetic by default).
    pub fn bind(config: &AppConfig, source: SensorSource, running: Arc<AtomicBool>) -> Result<Self> {
        let listener = TcpListener::bind(&config.network.bind_address).map_err(|e| {
            Error::Other(format!(
                "failed to bind to {}: {}",
                config.network.bind_address, e
            ))
        })?;
        listener.set_nonblocking(true)?;
        log::info!("sensor node listening on {}", config.network.bind_address);

        Ok(Self {
            listener,
            source,
            sampling: config.sampling.clone(),
            overlay_system_metrics: config.source.system_metrics,
            running,
            read_buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
        })
    }

    /// Actual bound address (useful with a port-0 bind)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve clients until the running flag clears.
    ///
    /// One client at a time; a failed session is logged and the accept
    /// loop continues.
    pub fn run(&mut self) -> Result<()> {
        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    log::info!("client connected: {}", addr);
                    match self.serve_client(stream) {
                        Ok(()) => log::info!("client disconnected: {}", addr),
                        Err(e) => log::warn!("client session ended: {}", e),
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(ACCEPT_POLL_MS));
                }
                Err(e) => {
                    log::error!("accept error: {}", e);
                }
            }
        }

        log::info!("sensor node stopped");
        Ok(())
    }

    /// Serve one client until it disconnects or the daemon shuts down
    fn serve_client(&mut self, mut stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)))?;

        let mut rate = Duration::from_millis(self.sampling.rate_ms);
        let heartbeat = Duration::from_millis(self.sampling.heartbeat_ms);
        let mut last_publish = Instant::now();
        let mut last_heartbeat = Instant::now();

        loop {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }

            match self.read_frame(&mut stream) {
                Ok(Some(text)) => {
                    if let Err(e) = self.handle_payload(&mut stream, &text, &mut rate) {
                        log::error!("failed to handle command: {}", e);
                    }
                }
                Ok(None) => {
                    // Timeout tick, fall through to the publish checks
                }
                Err(Error::Io(ref e))
                    if e.kind() == ErrorKind::UnexpectedEof
                        || e.kind() == ErrorKind::ConnectionReset =>
                {
                    return Ok(());
                }
                Err(e) => return Err(e),
            }

            if last_publish.elapsed() >= rate {
                self.publish_reading(&mut stream)?;
                last_publish = Instant::now();
            }

            if !heartbeat.is_zero() && last_heartbeat.elapsed() >= heartbeat {
                let payload = format!(
                    r#"{{"type":"heartbeat","timestamp":{}}}"#,
                    super::wall_clock_ms()
                );
                self.send_payload(&mut stream, &payload)?;
                last_heartbeat = Instant::now();
            }
        }

        Ok(())
    }

    /// Read one framed command, reusing the internal buffer.
    ///
    /// Returns `Ok(None)` on a read timeout (the periodic tick).
    fn read_frame(&mut self, stream: &mut TcpStream) -> Result<Option<String>> {
        let mut len_buf = [0u8; HEADER_LEN];
        match stream.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
            Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        }

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            return Err(Error::FrameTooLarge(len));
        }

        self.read_buffer.clear();
        self.read_buffer.resize(len, 0);
        stream.read_exact(&mut self.read_buffer)?;

        let text = std::str::from_utf8(&self.read_buffer)
            .map_err(|e| Error::Other(format!("command frame is not UTF-8: {}", e)))?;
        Ok(Some(text.to_string()))
    }

    /// Dispatch one decoded command payload
    fn handle_payload(
        &mut self,
        stream: &mut TcpStream,
        text: &str,
        rate: &mut Duration,
    ) -> Result<()> {
        let message = Message::from_payload(text)?;
        if message.kind != MessageKind::Command {
            log::warn!("ignoring unexpected {:?} frame from client", message.kind);
            return Ok(());
        }

        let value: Value = serde_json::from_str(&message.payload)
            .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;
        let command = value.get("cmd").and_then(Value::as_str).unwrap_or_default();
        log::debug!("received command: {}", command);

        match command {
            "get_sensor_data" => self.publish_reading(stream),
            "set_sampling_rate" => {
                let requested = value
                    .get("params")
                    .and_then(|params| params.get("rate_ms"))
                    .and_then(Value::as_u64)
                    .unwrap_or(self.sampling.rate_ms);
                let clamped = requested.clamp(MIN_RATE_MS, MAX_RATE_MS);
                *rate = Duration::from_millis(clamped);
                log::info!("sampling rate set to {}ms", clamped);

                let response = format!(
                    r#"{{"type":"response","cmd":"set_sampling_rate","success":true,"message":"Sampling rate set to {}ms"}}"#,
                    clamped
                );
                self.send_payload(stream, &response)
            }
            other => {
                log::warn!("unknown command: {:?}", other);
                Ok(())
            }
        }
    }

    /// Publish one reading from the source
    fn publish_reading(&mut self, stream: &mut TcpStream) -> Result<()> {
        let mut reading = self.source.current_reading();
        if self.overlay_system_metrics {
            reading.cpu_usage = system::cpu_usage();
            reading.memory_usage = system::memory_usage();
        }

        let payload = wire::encode_reading(&reading, super::wall_clock_ms())?;
        self.send_payload(stream, &payload)
    }

    fn send_payload(&mut self, stream: &mut TcpStream, payload: &str) -> Result<()> {
        let bytes = payload.as_bytes();
        if bytes.len() > MAX_FRAME_LEN {
            return Err(Error::FrameTooLarge(bytes.len()));
        }
        stream.write_all(&wire::encode_frame(bytes))?;
        Ok(())
    }
}
