//! Bridge configuration
//!
//! Loaded from YAML; every section and key is optional:
//!
//! ```yaml
//! serial:   { port: /dev/ttyUSB0, baud_rate: 38400, read_timeout_ms: 50 }
//! endpoint: { host: 127.0.0.1, port: 13013 }
//! protocol: { max_frame_scan: 1024, command_repeat: 2 }
//! logging:  { filter: info }
//! ```
//!
//! Command line values are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::protocol::DEFAULT_MAX_SCAN;
use crate::{BridgeError, Result};

const INLINE_SOURCE: &str = "<inline>";

/// Upper bound on the serial read timeout. Dropping the serial provider waits
/// one timeout for its reader thread, on the runtime thread.
pub const MAX_READ_TIMEOUT_MS: u64 = 100;

/// Serial line settings. The meter runs 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { port: String::new(), baud_rate: 38400, read_timeout_ms: 50 }
    }
}

impl SerialConfig {
    /// Read timeout clamped to `1..=MAX_READ_TIMEOUT_MS` milliseconds.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.clamp(1, MAX_READ_TIMEOUT_MS))
    }
}

/// UDP destination of the status feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 13013 }
    }
}

/// Framing and command behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Bytes scanned for a terminator before the buffer is discarded
    pub max_frame_scan: usize,
    /// How many times each control frame is written
    pub command_repeat: u8,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self { max_frame_scan: DEFAULT_MAX_SCAN, command_repeat: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub serial: SerialConfig,
    pub endpoint: EndpointConfig,
    pub protocol: ProtocolConfig,
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Load and parse a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::config(path.display().to_string(), e.to_string()))?;
        let config = Self::parse(&text, &path.display().to_string())?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse(text, INLINE_SOURCE)
    }

    fn parse(text: &str, source: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(text).map_err(|e| BridgeError::config(source, e.to_string()))
    }

    /// Check everything a live serial session needs.
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            return Err(BridgeError::config("serial.port", "no serial port given"));
        }
        if self.serial.baud_rate == 0 {
            return Err(BridgeError::config("serial.baud_rate", "must be greater than zero"));
        }
        self.validate_endpoint()
    }

    /// Check the settings shared by live and replay sessions.
    pub fn validate_endpoint(&self) -> Result<()> {
        if self.endpoint.host.trim().is_empty() {
            return Err(BridgeError::config("endpoint.host", "no endpoint host given"));
        }
        if self.endpoint.port == 0 {
            return Err(BridgeError::config("endpoint.port", "must be greater than zero"));
        }
        if self.protocol.max_frame_scan == 0 {
            return Err(BridgeError::config("protocol.max_frame_scan", "must be greater than zero"));
        }
        if self.protocol.command_repeat == 0 {
            return Err(BridgeError::config("protocol.command_repeat", "must be greater than zero"));
        }
        Ok(())
    }
}
