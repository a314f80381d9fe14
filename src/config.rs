//! # Configuration Management
//!
//! Centralized configuration for the segmented message protocol.
//!
//! This module provides structured configuration for session handling, the
//! packet transport, and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Sizing
//! The chunk capacity (`frame_size`) plus the 8-byte START prefix must fit the
//! link's packet ceiling (`max_packet_size`). Radio links carry tens of bytes
//! per packet, hence the small defaults.

use crate::core::frame::START_FRAME_OVERHEAD;
use crate::error::{ProtocolError, Result};
use crate::protocol::reassembler::DEFAULT_MAX_FRAME_INDEX;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default link packet ceiling in bytes
pub const DEFAULT_MAX_PACKET_SIZE: usize = 64;

/// Default chunk capacity per frame
pub const DEFAULT_FRAME_SIZE: usize = DEFAULT_MAX_PACKET_SIZE - START_FRAME_OVERHEAD;

/// Default idle time before an incomplete session is evicted
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between eviction sweeps
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(5);

/// Default cap on concurrently buffered sessions
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProtocolConfig {
    /// Fragmentation and reassembly settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProtocolConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SEGMENT_PROTOCOL_BIND_ADDRESS") {
            config.transport.bind_address = addr;
        }

        if let Ok(size) = std::env::var("SEGMENT_PROTOCOL_MAX_PACKET_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.transport.max_packet_size = val;
            }
        }

        if let Ok(size) = std::env::var("SEGMENT_PROTOCOL_FRAME_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.session.frame_size = val;
            }
        }

        if let Ok(timeout) = std::env::var("SEGMENT_PROTOCOL_SESSION_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.session.session_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(max) = std::env::var("SEGMENT_PROTOCOL_MAX_SESSIONS") {
            if let Ok(val) = max.parse::<usize>() {
                config.session.max_sessions = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.session.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());

        // Cross-section: a START frame must fit in one packet
        let worst_case = self.session.frame_size.saturating_add(START_FRAME_OVERHEAD);
        if worst_case > self.transport.max_packet_size {
            errors.push(format!(
                "frame_size {} plus {} bytes of START overhead exceeds max_packet_size {}",
                self.session.frame_size, START_FRAME_OVERHEAD, self.transport.max_packet_size
            ));
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Fragmentation and reassembly configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Chunk capacity per frame, excluding frame overhead
    pub frame_size: usize,

    /// Highest frame index accepted on the receive side
    pub max_frame_index: u16,

    /// Idle time after which an incomplete session is evicted
    #[serde(with = "duration_serde")]
    pub session_timeout: Duration,

    /// How often the transport sweeps for stale sessions
    #[serde(with = "duration_serde")]
    pub eviction_interval: Duration,

    /// Maximum number of concurrently buffered sessions
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            max_frame_index: DEFAULT_MAX_FRAME_INDEX,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            eviction_interval: DEFAULT_EVICTION_INTERVAL,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl SessionConfig {
    /// Validate session configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.frame_size == 0 {
            errors.push("Frame size must be greater than 0".to_string());
        }

        if self.session_timeout.as_millis() < 10 {
            errors.push("Session timeout too short (minimum: 10ms)".to_string());
        } else if self.session_timeout.as_secs() > 3600 {
            errors.push("Session timeout too long (maximum: 1 hour)".to_string());
        }

        if self.eviction_interval.as_millis() < 10 {
            errors.push("Eviction interval too short (minimum: 10ms)".to_string());
        } else if self.eviction_interval > self.session_timeout {
            errors.push(format!(
                "Eviction interval ({}ms) longer than session timeout ({}ms)",
                self.eviction_interval.as_millis(),
                self.session_timeout.as_millis()
            ));
        }

        if self.max_sessions == 0 {
            errors.push("Max sessions must be greater than 0".to_string());
        } else if self.max_sessions > 1_000_000 {
            errors.push(format!(
                "Max sessions too large: {} (max recommended: 1,000,000)",
                self.max_sessions
            ));
        }

        errors
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Local bind address (e.g., "0.0.0.0:7400")
    pub bind_address: String,

    /// Hard per-packet size ceiling of the link
    pub max_packet_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0:7400"),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.bind_address.is_empty() {
            errors.push("Bind address cannot be empty".to_string());
        } else if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid bind address format: '{}' (expected format: '0.0.0.0:7400')",
                self.bind_address
            ));
        }

        if self.max_packet_size <= START_FRAME_OVERHEAD {
            errors.push(format!(
                "Max packet size too small: {} (must exceed {} bytes of frame overhead)",
                self.max_packet_size, START_FRAME_OVERHEAD
            ));
        } else if self.max_packet_size > 65_507 {
            errors.push(format!(
                "Max packet size too large: {} (maximum UDP payload: 65507)",
                self.max_packet_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to include the event target in log lines
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("segment-protocol"),
            log_level: Level::INFO,
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
