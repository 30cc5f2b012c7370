//! # Configuration
//!
//! Engine configuration: connection parameters, framing limits, and
//! logging options.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Direct instantiation with defaults
//!
//! ## Security Considerations
//! - The frame-length cap bounds allocation before any body is read
//! - The inflated-size cap prevents decompression bombs

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Protocol cap on a frame length prefix (3-byte varint maximum).
pub const MAX_FRAME_LENGTH: usize = 2_097_151;

/// Upper bound on a single inflated packet body.
pub const MAX_INFLATED_LENGTH: usize = 8 * 1024 * 1024;

/// Engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Timeout for the initial TCP connect.
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// Maximum accepted frame length (length-prefix value).
    pub max_frame_length: usize,

    /// Maximum accepted inflated body size.
    pub max_inflated_length: usize,

    /// Zlib level used once the server enables compression (0-9).
    pub compression_level: u32,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            max_frame_length: MAX_FRAME_LENGTH,
            max_inflated_length: MAX_INFLATED_LENGTH,
            compression_level: 6,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::Config(format!("failed to parse TOML: {e}")))
    }

    /// Validate the configuration; an empty list means it is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.connection_timeout.as_millis() < 100 {
            errors.push("connection timeout too short (minimum: 100ms)".to_string());
        }

        if self.max_frame_length == 0 {
            errors.push("max frame length cannot be 0".to_string());
        } else if self.max_frame_length > MAX_FRAME_LENGTH {
            errors.push(format!(
                "max frame length {} exceeds the protocol cap {}",
                self.max_frame_length, MAX_FRAME_LENGTH
            ));
        }

        if self.max_inflated_length < self.max_frame_length {
            errors.push("max inflated length must be at least max frame length".to_string());
        }

        if self.compression_level > 9 {
            errors.push(format!(
                "invalid compression level: {} (valid range: 0-9)",
                self.compression_level
            ));
        }

        errors
    }

    /// Validate and return `Result` - convenience method.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::Config(format!(
                "configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to emit log lines to stderr.
    pub log_to_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            log_to_console: true,
        }
    }
}

/// Helper module for Duration serialization as milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for `tracing::Level` serialization.
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        level.to_string().to_lowercase().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("invalid log level: {level_str}")))
    }
}
