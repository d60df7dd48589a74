//! Sensor data source abstraction
//!
//! Selects between synthetic generation and live-transport-backed data
//! behind one query surface, so the consumer doesn't care which mode is
//! active. The source does not drive the session's drain loop; polling
//! remains the external driver's responsibility.

pub mod synthetic;
pub mod system;

use crate::config::SourceConfig;
use crate::core::types::{ConnectionState, SensorReading, SourceMode};
use crate::error::Result;
use crate::streaming::TelemetryClient;
use synthetic::SyntheticGenerator;

/// Sensor source dispatching on a [`SourceMode`]
pub struct SensorSource {
    mode: SourceMode,
    generator: SyntheticGenerator,
    client: TelemetryClient,
}

impl SensorSource {
    /// Create a source in the given mode with an entropy-seeded generator
    pub fn new(mode: SourceMode) -> Self {
        Self::with_seed(mode, 0)
    }

    /// Create a source with an explicit generator seed (0 = entropy)
    pub fn with_seed(mode: SourceMode, seed: u64) -> Self {
        Self {
            mode,
            generator: SyntheticGenerator::new(seed),
            client: TelemetryClient::new(),
        }
    }

    /// Create a source from the config file section
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::with_seed(config.mode, config.seed)
    }

    /// Current reading for the active mode.
    ///
    /// - `Synthetic`: a fresh draw from the generator, always valid.
    /// - `LiveTransport`: the session's latest cached reading when
    ///   connected, otherwise an invalid default.
    /// - `Replay`: not implemented yet; always an invalid default.
    pub fn current_reading(&mut self) -> SensorReading {
        match self.mode {
            SourceMode::Synthetic => self.generator.next_reading(),
            SourceMode::LiveTransport => {
                if self.client.state() == ConnectionState::Connected {
                    *self.client.latest_reading()
                } else {
                    SensorReading::default()
                }
            }
            SourceMode::Replay => SensorReading::default(),
        }
    }

    /// Switch mode; takes effect on the next [`SensorSource::current_reading`].
    ///
    /// Switching away from `LiveTransport` does not disconnect the session.
    pub fn set_mode(&mut self, mode: SourceMode) {
        self.mode = mode;
    }

    /// Active mode
    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Connect the underlying session, forcing `LiveTransport` mode first
    pub fn connect_remote(&mut self, host: &str, port: u16) -> Result<()> {
        self.set_mode(SourceMode::LiveTransport);
        self.client.connect(host, port)
    }

    /// Disconnect the underlying session (mode is left unchanged)
    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }

    /// Whether the underlying session is connected
    pub fn is_connected(&self) -> bool {
        self.client.state() == ConnectionState::Connected
    }

    /// Underlying session, for status queries
    pub fn client(&self) -> &TelemetryClient {
        &self.client
    }

    /// Underlying session, for the driver's drain/command calls
    pub fn client_mut(&mut self) -> &mut TelemetryClient {
        &mut self.client
    }
}
