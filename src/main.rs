//! setu-link - Sensor node daemon
//!
//! Serves the telemetry link over TCP (default port 8080): length-prefixed
//! JSON frames, one client at a time. Sensor-data frames go out at the
//! configured sampling rate, heartbeats at the heartbeat interval, and
//! client commands (`get_sensor_data`, `set_sampling_rate`) are answered
//! in-line.

use setu_link::config::AppConfig;
use setu_link::error::{Error, Result};
use setu_link::source::SensorSource;
use setu_link::streaming::SensorServer;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `setu-link <path>` (positional)
/// - `setu-link --config <path>` (flag-based)
/// - `setu-link -c <path>` (short flag)
///
/// Defaults to `/etc/setu-link.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    // Default path
    "/etc/setu-link.toml".to_string()
}

fn main() -> Result<()> {
    // Get config path from args or default
    let config_path = parse_config_path();
    let config = match AppConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config {} not loaded ({}), using defaults", config_path, e);
            AppConfig::default()
        }
    };

    // Initialize logger from the config
    let env = env_logger::Env::default().default_filter_or(config.logging.level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    if config.logging.output == "stderr" {
        builder.target(env_logger::Target::Stderr);
    } else {
        builder.target(env_logger::Target::Stdout);
    }
    builder.init();

    log::info!("setu-link v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("using config: {}", config_path);
    log::info!(
        "source: {:?} (sampling {}ms, heartbeat {}ms)",
        config.source.mode,
        config.sampling.rate_ms,
        config.sampling.heartbeat_ms
    );

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);

    ctrlc::set_handler(move || {
        log::info!("received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("error setting Ctrl-C handler: {}", e)))?;

    let source = SensorSource::from_config(&config.source);
    let mut server = SensorServer::bind(&config, source, Arc::clone(&running))?;

    log::info!("setu-link running. Press Ctrl-C to stop.");
    server.run()?;

    log::info!("setu-link stopped");
    Ok(())
}
