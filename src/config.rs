//! Configuration for the setu-link daemon and client defaults
//!
//! Loads configuration from a TOML file with the minimal parameters needed
//! for the telemetry link.

use crate::core::types::SourceMode;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub source: SourceConfig,
    pub sampling: SamplingConfig,
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// TCP listen address for the sensor node daemon
    ///
    /// Examples:
    /// - `0.0.0.0:8080` - Bind to all interfaces on port 8080
    /// - `127.0.0.1:8080` - Localhost only
    pub bind_address: String,

    /// Default peer host for client connections
    pub remote_host: String,

    /// Default peer port for client connections
    pub remote_port: u16,
}

/// Sensor source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Which generator readings are drawn from
    pub mode: SourceMode,

    /// Seed for the synthetic generator (0 = random entropy)
    pub seed: u64,

    /// Overlay real cpu/memory usage from /proc in the daemon
    pub system_metrics: bool,
}

/// Publish timing for the sensor node daemon
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingConfig {
    /// Interval between periodic sensor-data frames (milliseconds)
    pub rate_ms: u64,

    /// Interval between heartbeat frames (milliseconds, 0 disables)
    pub heartbeat_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log output (stdout or stderr)
    pub output: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Default configuration for a local sensor node
    ///
    /// Suitable for testing and development. Production deployments should
    /// use a proper TOML configuration file.
    pub fn sensor_node_defaults() -> Self {
        Self {
            network: NetworkConfig {
                bind_address: "0.0.0.0:8080".to_string(),
                remote_host: "127.0.0.1".to_string(),
                remote_port: 8080,
            },
            source: SourceConfig {
                mode: SourceMode::Synthetic,
                seed: 0,
                system_metrics: true,
            },
            sampling: SamplingConfig {
                rate_ms: 1000,
                heartbeat_ms: 5000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                output: "stdout".to_string(),
            },
        }
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::sensor_node_defaults()
    }
}
