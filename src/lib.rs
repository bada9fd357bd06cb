//! Bridge an Array Solutions PowerMaster power/SWR meter to a UDP status feed.
//!
//! The meter streams checksummed ASCII frames over a serial line. This crate
//! reassembles them from arbitrarily fragmented reads, validates and decodes
//! the real-time reports, and re-emits each report as one compact datagram.
//!
//! # Features
//!
//! - **Resilient framing**: noise, split frames, corrupt checksums and runaway
//!   frames are dropped and counted, never fatal
//! - **Single owner**: one task owns the byte path, no locks on the hot path
//! - **Replay**: captured serial traffic plays back through the same pipeline
//!
//! # Layers
//!
//! - [`protocol`]: checksum, frame assembly, decoding and command frames
//! - [`Pipeline`]: the synchronous inbound byte path with discard statistics
//! - [`Forwarder`]: datagram formatting and sending
//! - [`Session`]: a running bridge with start/stop control and subscriptions
//!
//! ## Example (replay)
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use powermaster::{BridgeConfig, PowerMaster, UpdateRate};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> powermaster::Result<()> {
//!     let config = BridgeConfig::default();
//!     let session =
//!         PowerMaster::replay("capture.hex", &config, Duration::from_millis(50), 7).await?;
//!
//!     let mut records = session.subscribe(UpdateRate::Max(2));
//!     while let Some(record) = records.next().await {
//!         println!("forward {:.1} W, vswr {:.2}", record.forward_power, record.vswr);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Byte path
pub mod forwarder;
pub mod pipeline;
pub mod protocol;

// Stream-based session architecture
pub mod config;
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use config::BridgeConfig;
pub use connection::Session;
pub use driver::DriverOptions;
pub use forwarder::{DatagramSink, Forwarder, UdpSink, format_record};
pub use pipeline::{FrameObserver, Pipeline, PipelineStats};
pub use provider::{ByteSource, CommandSink};

use std::path::Path;
use std::time::Duration;
use tracing::info;

use providers::{NullCommandSink, ReplayProvider, SerialProvider};

/// Unified entry point for bridge sessions.
///
/// Both constructors return a [`Session`]; a live session is already
/// streaming, a replay session plays back a capture to the same endpoint.
pub struct PowerMaster;

impl PowerMaster {
    /// Open the serial port, bind the UDP feed and start streaming.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is incomplete (no serial port, zero ports)
    /// - The serial port cannot be opened
    /// - The endpoint does not resolve or no local socket can be bound
    /// - The start command cannot be written
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use powermaster::{BridgeConfig, PowerMaster};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> powermaster::Result<()> {
    /// let mut config = BridgeConfig::default();
    /// config.serial.port = "COM3".to_string();
    /// let session = PowerMaster::connect(&config).await?;
    /// let final_state = session.shutdown().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &BridgeConfig) -> Result<Session> {
        config.validate()?;

        let sink = UdpSink::connect(&config.endpoint.host, config.endpoint.port).await?;
        let (source, commands) = SerialProvider::open(&config.serial)?;

        let session = Session::with_parts(source, commands, sink, driver_options(config));
        session.start().await?;
        info!(
            "Streaming {} -> {}:{}",
            config.serial.port, config.endpoint.host, config.endpoint.port
        );
        Ok(session)
    }

    /// Play back a capture file through the bridge.
    ///
    /// Commands are logged instead of written. Streaming starts before the
    /// first chunk is read and the session ends with [`StreamState::Ended`]
    /// after the last one.
    pub async fn replay<P: AsRef<Path>>(
        path: P,
        config: &BridgeConfig,
        pace: Duration,
        chunk_size: usize,
    ) -> Result<Session> {
        config.validate_endpoint()?;

        let source = ReplayProvider::open(path, chunk_size, pace)?;
        let sink = UdpSink::connect(&config.endpoint.host, config.endpoint.port).await?;

        // Started by the task itself so the first chunk is not read while idle
        let options = DriverOptions { auto_start: true, ..driver_options(config) };
        Ok(Session::with_parts(source, NullCommandSink::default(), sink, options))
    }
}

fn driver_options(config: &BridgeConfig) -> DriverOptions {
    DriverOptions {
        max_scan: config.protocol.max_frame_scan,
        command_repeat: config.protocol.command_repeat,
        auto_start: false,
        observer: None,
    }
}
