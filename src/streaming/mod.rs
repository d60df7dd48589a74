//! TCP streaming module for the telemetry link

pub mod client;
pub mod messages;
pub mod server;
pub mod wire;

pub use client::TelemetryClient;
pub use messages::{Message, MessageKind};
pub use server::SensorServer;
pub use wire::{DecodeError, HEADER_LEN, MAX_FRAME_LEN};

/// Wall-clock milliseconds since the epoch (0 if the clock is unusable)
pub(crate) fn wall_clock_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
