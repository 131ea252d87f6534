//! Server configuration module
//!
//! Provides CLI argument parsing and validation for the wspulse server.

use clap::{Parser, ValueEnum};
use std::time::Duration;
use tracing::debug;

/// Traffic mode, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServerMode {
    /// Broadcast events to every connected client at a fixed rate
    Push,
    /// Echo timed responses to each client request
    Rtt,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "wspulse-server")]
#[command(about = "WebSocket latency measurement server")]
pub struct ServerConfig {
    /// Bind port
    #[arg(long, default_value_t = 10443)]
    pub port: u16,

    /// Traffic mode
    #[arg(long, value_enum, default_value_t = ServerMode::Push)]
    pub mode: ServerMode,

    /// Broadcast events per second (push mode)
    #[arg(long, default_value_t = 10)]
    pub rate: u32,

    /// Event payload size in bytes (push mode)
    #[arg(long, default_value_t = 100)]
    pub payload_size: usize,

    /// Monitor status interval in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub update_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

impl ServerConfig {
    /// Interval between broadcast events (1000 / rate milliseconds)
    pub fn event_interval(&self) -> Duration {
        Duration::from_millis((1000 / self.rate.max(1)) as u64)
    }

    /// Returns true if JSON format logging is enabled
    pub fn is_json_format(&self) -> bool {
        self.log_format.to_lowercase() == "json"
    }

    /// Validates the configuration values
    pub fn validate(&self) -> Result<(), String> {
        debug!("Validating server configuration");

        if self.port == 0 {
            return Err("port must be > 0".into());
        }
        if self.rate == 0 || self.rate > 1000 {
            return Err("rate must be between 1 and 1000 events per second".into());
        }
        if self.update_interval == 0 {
            return Err("update_interval must be > 0".into());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            ));
        }

        debug!("Server configuration validated successfully");
        Ok(())
    }
}
