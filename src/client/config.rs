use crate::client::error::{ClientError, Result};
use clap::{Parser, ValueEnum};
use std::time::Duration;
use tracing::debug;

/// Traffic mode, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClientMode {
    /// Passively consume server-pushed broadcast events
    Push,
    /// Issue timed requests and match the echoed responses
    Rtt,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "wspulse-client")]
#[command(about = "WebSocket latency measurement client")]
pub struct ClientConfig {
    /// WebSocket server URL
    #[arg(long, default_value = "ws://localhost:10443/ws")]
    pub server: String,

    /// Traffic mode
    #[arg(long, value_enum, default_value_t = ClientMode::Rtt)]
    pub mode: ClientMode,

    /// Requests per second (rtt mode)
    #[arg(long, default_value_t = 10)]
    pub rate: u32,

    /// Test duration in seconds
    #[arg(long, default_value_t = 30)]
    pub duration: u64,

    /// Request payload size in bytes (rtt mode)
    #[arg(long, default_value_t = 100)]
    pub payload_size: usize,

    /// Skip the first N samples as warm-up
    #[arg(long, default_value_t = 100)]
    pub prewarm_count: usize,

    /// Run until interrupted instead of for a fixed duration
    #[arg(long)]
    pub continuous: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Disable the progress display (useful for Docker/systemd/non-interactive environments)
    #[arg(long)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

impl ClientConfig {
    /// Interval between paced requests (1000 / rate milliseconds)
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis((1000 / self.rate.max(1)) as u64)
    }

    /// Returns the configured test duration as a Duration
    pub fn test_duration(&self) -> Duration {
        Duration::from_secs(self.duration)
    }

    /// Returns true if JSON format logging is enabled
    pub fn is_json_format(&self) -> bool {
        self.log_format.to_lowercase() == "json"
    }

    /// Validates the configuration values
    pub fn validate(&self) -> Result<()> {
        debug!("Validating client configuration");

        if !self.server.starts_with("ws://") && !self.server.starts_with("wss://") {
            return Err(ClientError::Config(
                "server must be a ws:// or wss:// URL".into(),
            ));
        }
        if self.rate == 0 || self.rate > 1000 {
            return Err(ClientError::Config(
                "rate must be between 1 and 1000 messages per second".into(),
            ));
        }
        if !self.continuous && self.duration == 0 {
            return Err(ClientError::Config(
                "duration must be > 0 unless --continuous is set".into(),
            ));
        }

        debug!("Client configuration validated successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ClientConfig {
        ClientConfig {
            server: "ws://localhost:10443/ws".to_string(),
            mode: ClientMode::Rtt,
            rate: 10,
            duration: 30,
            payload_size: 100,
            prewarm_count: 100,
            continuous: false,
            insecure: false,
            quiet: false,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = base_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_interval(), Duration::from_millis(100));
        assert!(!config.is_json_format());
    }

    #[test]
    fn test_invalid_scheme() {
        let mut config = base_config();
        config.server = "http://localhost:10443".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_rate() {
        let mut config = base_config();
        config.rate = 0;
        assert!(config.validate().is_err());
        config.rate = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_duration_requires_continuous() {
        let mut config = base_config();
        config.duration = 0;
        assert!(config.validate().is_err());
        config.continuous = true;
        assert!(config.validate().is_ok());
    }
}
