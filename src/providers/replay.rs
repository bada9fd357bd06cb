//! Replay provider for captured serial traffic
//!
//! A capture is either text holding whitespace separated hex byte pairs,
//! with `#` starting a comment, or a raw binary dump of the line:
//!
//! ```text
//! # start-stream echo, then one report
//! 02 44 31 03 43 30 0D
//! 02 44 2C 31 30 30 2E 30 2C 32 2E 35 2C 31 2E 33 38 03 30 41 0D
//! ```
//!
//! Bytes are handed out in fixed-size chunks at a fixed pace, which also
//! exercises reassembly of frames split across reads.

use std::path::Path;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::provider::{ByteSource, CommandSink};
use crate::protocol::crc8;
use crate::{BridgeError, Result};

/// Replay provider that plays back a capture file
pub struct ReplayProvider {
    name: String,
    bytes: Vec<u8>,
    position: usize,
    chunk_size: usize,
    interval: Interval,
}

impl ReplayProvider {
    /// Load a capture file and play it back `chunk_size` bytes per `pace`.
    pub fn open<P: AsRef<Path>>(path: P, chunk_size: usize, pace: Duration) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| BridgeError::capture(path, e))?;
        let bytes = parse_capture(&raw);

        info!(
            "Opened capture {}: {} bytes ({})",
            path.display(),
            bytes.len(),
            if bytes.len() == raw.len() { "binary" } else { "hex text" }
        );

        Ok(Self::from_bytes(path.display().to_string(), bytes, chunk_size, pace))
    }

    /// Play back bytes already in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: Vec<u8>,
        chunk_size: usize,
        pace: Duration,
    ) -> Self {
        // tokio intervals panic on a zero period
        let mut interval = interval(pace.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { name: name.into(), bytes, position: 0, chunk_size: chunk_size.max(1), interval }
    }

    /// Bytes not yet played back.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Total capture length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[async_trait::async_trait]
impl ByteSource for ReplayProvider {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.position >= self.bytes.len() {
            debug!("Reached end of capture {}", self.name);
            return Ok(None);
        }

        self.interval.tick().await;

        let end = (self.position + self.chunk_size).min(self.bytes.len());
        let chunk = self.bytes[self.position..end].to_vec();
        self.position = end;

        trace!("Replayed {}/{} bytes", self.position, self.bytes.len());
        Ok(Some(chunk))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Decode hex text, falling back to the raw bytes for anything else.
pub fn parse_capture(raw: &[u8]) -> Vec<u8> {
    std::str::from_utf8(raw).ok().and_then(parse_hex_text).unwrap_or_else(|| raw.to_vec())
}

fn parse_hex_text(text: &str) -> Option<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut tokens = 0usize;
    for line in text.lines() {
        let content = line.split('#').next().unwrap_or_default();
        for token in content.split_whitespace() {
            let &[high, low] = token.as_bytes() else {
                return None;
            };
            bytes.push(crc8::decode_hex(high, low).ok()?);
            tokens += 1;
        }
    }
    (tokens > 0).then_some(bytes)
}

/// Command sink for sessions without a device: commands are only logged.
#[derive(Debug, Default)]
pub struct NullCommandSink {
    written: u64,
}

impl NullCommandSink {
    /// Frames written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl CommandSink for NullCommandSink {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.written += 1;
        debug!("Discarding command frame {:02X?} (no device attached)", frame);
        Ok(())
    }
}
