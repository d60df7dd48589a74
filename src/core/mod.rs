//! Core data types shared across the crate

pub mod types;

pub use types::{ConnectionState, ConnectionStatus, SensorReading, SourceMode};
