//! Error types for the PowerMaster bridge.
//!
//! Two families of errors live here:
//!
//! - [`BridgeError`] covers everything that can go wrong *around* the byte
//!   path: opening the serial port, reading from it, sending datagrams,
//!   loading configuration and capture files.
//! - [`FrameError`] classifies why a single candidate frame was rejected.
//!   These never leave the ingestion path; the pipeline counts them and
//!   moves on to the next frame.
//!
//! ## Recovery
//!
//! ```rust
//! use powermaster::BridgeError;
//!
//! let error = BridgeError::transport_failed("serial read returned EIO");
//! if !error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```
//!
//! ## Session-fatal errors
//!
//! A failed UDP send is the only error that halts streaming. The driver
//! checks [`BridgeError::is_fatal_to_session`] and answers with a stop
//! command rather than retrying.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Serial port error on {port}")]
    Serial {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to forward telemetry to {destination}")]
    Forwarding {
        destination: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error in {path}: {details}")]
    Config { path: String, details: String },

    #[error("Capture file error: {path}")]
    Capture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session error: {reason}")]
    Session { reason: String },
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Serial { .. } => true,
            BridgeError::Transport { .. } => false,
            BridgeError::Forwarding { .. } => false,
            BridgeError::Config { .. } => false,
            BridgeError::Capture { .. } => false,
            BridgeError::Session { .. } => false,
        }
    }

    /// Returns whether this error ends the current streaming session.
    ///
    /// Only forwarding failures qualify: the driver sends the stop command
    /// and clears its buffers, but the process keeps running.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, BridgeError::Forwarding { .. })
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::Serial { .. } => vec![
                "Check the COM port name and that the meter is powered",
                "Close other programs holding the serial port",
                "Verify the baud rate matches the meter setting",
            ],
            BridgeError::Transport { .. } => vec![
                "Check the USB/serial cable",
                "Reopen the serial port",
                "Restart streaming once the device is reachable",
            ],
            BridgeError::Forwarding { .. } => vec![
                "Verify the endpoint host and port",
                "Check that the network interface is up",
                "Restart streaming after the endpoint is reachable",
            ],
            BridgeError::Config { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Compare against the documented configuration keys",
            ],
            BridgeError::Capture { .. } => vec![
                "Check the capture file exists and is readable",
                "Use whitespace separated hex bytes or a raw binary dump",
            ],
            BridgeError::Session { .. } => vec![
                "Open a new session",
                "Check the log output for the driver shutdown reason",
            ],
        }
    }

    /// Helper constructor for serial port errors.
    pub fn serial(port: impl Into<String>, source: serialport::Error) -> Self {
        BridgeError::Serial { port: port.into(), source }
    }

    /// Helper constructor for transport errors.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        BridgeError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for forwarding failures.
    pub fn forwarding(destination: impl Into<String>, source: std::io::Error) -> Self {
        BridgeError::Forwarding { destination: destination.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(path: impl Into<String>, details: impl Into<String>) -> Self {
        BridgeError::Config { path: path.into(), details: details.into() }
    }

    /// Helper constructor for capture file errors.
    pub fn capture(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BridgeError::Capture { path: path.into(), source }
    }

    /// Helper constructor for session errors.
    pub fn session(reason: impl Into<String>) -> Self {
        BridgeError::Session { reason: reason.into() }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Transport { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<serialport::Error> for BridgeError {
    fn from(err: serialport::Error) -> Self {
        BridgeError::Serial { port: "<unknown>".to_string(), source: err }
    }
}

/// Reason a single candidate frame was dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("ETX delimiter missing before checksum")]
    MissingDelimiter,

    #[error("Checksum mismatch: frame carries {expected:#04x}, payload hashes to {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Checksum digit {digit:#04x} is not hexadecimal")]
    MalformedChecksum { digit: u8 },

    #[error("Payload parse failure: {details}")]
    PayloadParseFailure { details: String },

    #[error("No terminator within {scanned} bytes, buffer discarded")]
    FrameTooLong { scanned: usize },
}

impl FrameError {
    /// Short stable label, used for log fields and statistics.
    pub fn label(&self) -> &'static str {
        match self {
            FrameError::MissingDelimiter => "missing_delimiter",
            FrameError::ChecksumMismatch { .. } => "checksum_mismatch",
            FrameError::MalformedChecksum { .. } => "malformed_checksum",
            FrameError::PayloadParseFailure { .. } => "payload_parse_failure",
            FrameError::FrameTooLong { .. } => "frame_too_long",
        }
    }

    pub(crate) fn parse(details: impl Into<String>) -> Self {
        FrameError::PayloadParseFailure { details: details.into() }
    }
}
