//! setu-link - Point-to-point TCP telemetry link for remote sensor nodes
//!
//! This library provides the client session, wire codec, and sensor source
//! abstraction for exchanging length-prefixed JSON frames with a sensor
//! node, plus the node daemon serving the other end of the link.
//!
//! The client is single-threaded and poll-driven: the consumer connects,
//! registers callbacks, and calls [`TelemetryClient::drain_incoming`]
//! (re-exported from [`streaming`]) once per tick of its own loop.

pub mod config;
pub mod core;
pub mod error;
pub mod source;
pub mod streaming;

// Re-export commonly used types
pub use crate::core::types::{ConnectionState, ConnectionStatus, SensorReading, SourceMode};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use source::SensorSource;
pub use streaming::{Message, MessageKind, SensorServer, TelemetryClient};
