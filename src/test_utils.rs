//! Test utilities: frame builders, in-memory sources and sinks, fixture paths
//!
//! Compiled for unit tests and for the `benchmark` feature so benches and
//! integration tests can share the same helpers.

#![cfg(any(test, feature = "benchmark"))]

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::Result;
use crate::forwarder::DatagramSink;
use crate::protocol::encode_command;
use crate::provider::{ByteSource, CommandSink};

/// Path of a capture under `test-data/captures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data").join("captures").join(name)
}

/// A complete report frame without status field.
pub fn report_frame(forward: f64, reflected: f64, vswr: f64) -> Vec<u8> {
    encode_command(&format!("D,{forward:.1},{reflected:.1},{vswr:.2}"))
}

/// A complete report frame with a `;` separated status field.
pub fn report_frame_with_status(forward: f64, reflected: f64, vswr: f64, status: &str) -> Vec<u8> {
    encode_command(&format!("D,{forward:.1},{reflected:.1},{vswr:.2},{status}"))
}

/// `count` report frames back to back, with varying readings.
pub fn report_stream(count: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|i| {
            let forward = 50.0 + (i % 100) as f64;
            if i % 2 == 0 {
                report_frame(forward, 1.5, 1.2)
            } else {
                report_frame_with_status(forward, 0.5, 1.05, "0;0;0;1;0")
            }
        })
        .collect()
}

/// Byte source fed from a channel. Dropping the sender ends the source.
pub struct ChannelSource {
    chunks: mpsc::UnboundedReceiver<Result<Vec<u8>>>,
}

/// Sending half of a [`ChannelSource`].
pub type ChannelFeeder = mpsc::UnboundedSender<Result<Vec<u8>>>;

/// Create a source and the handle that feeds it.
pub fn channel_source() -> (ChannelFeeder, ChannelSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ChannelSource { chunks: rx })
}

#[async_trait::async_trait]
impl ByteSource for ChannelSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.chunks.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Command sink that records every frame written.
///
/// Writes can be made to fail through [`RecordingCommandSink::fail_writes`];
/// failed writes are not recorded.
#[derive(Debug, Default, Clone)]
pub struct RecordingCommandSink {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingCommandSink {
    /// Shared view of the frames written so far.
    pub fn frames(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.frames)
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }
}

impl CommandSink for RecordingCommandSink {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        if self.failing.lock().map(|flag| *flag).unwrap_or(true) {
            return Err(crate::BridgeError::transport_failed("command port unplugged"));
        }
        let mut frames = self.frames.lock().map_err(|_| crate::BridgeError::session("poisoned"))?;
        frames.push(frame.to_vec());
        Ok(())
    }
}

/// Datagram sink that keeps every datagram in memory.
///
/// Sends can be made to fail through [`MemoryDatagramSink::fail_sends`].
#[derive(Debug, Default, Clone)]
pub struct MemoryDatagramSink {
    datagrams: Arc<Mutex<Vec<Vec<u8>>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryDatagramSink {
    /// Shared view of the datagrams sent so far.
    pub fn datagrams(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.datagrams)
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn fail_sends(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    /// Datagrams as UTF-8 text.
    pub fn texts(&self) -> Vec<String> {
        self.datagrams
            .lock()
            .map(|d| d.iter().map(|bytes| String::from_utf8_lossy(bytes).into_owned()).collect())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DatagramSink for MemoryDatagramSink {
    async fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        if self.failing.lock().map(|flag| *flag).unwrap_or(true) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "endpoint unreachable"));
        }
        self.datagrams
            .lock()
            .map_err(|_| io::Error::other("poisoned"))?
            .push(datagram.to_vec());
        Ok(())
    }

    fn destination(&self) -> String {
        "memory".to_string()
    }
}

/// Datagram sink whose sends always fail.
#[derive(Debug, Default)]
pub struct FailingDatagramSink;

#[async_trait::async_trait]
impl DatagramSink for FailingDatagramSink {
    async fn send(&mut self, _datagram: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::ConnectionRefused, "endpoint unreachable"))
    }

    fn destination(&self) -> String {
        "unreachable".to_string()
    }
}
