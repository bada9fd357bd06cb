//! Reassembly of frames from an arbitrarily chunked byte stream
//!
//! The serial transport hands over bytes in whatever pieces the OS
//! delivers. [`FrameAssembler`] owns the accumulation buffer and cuts
//! complete `STX ... TERM` frames out of it:
//!
//! 1. Leading bytes that are not STX are noise and are dropped one at a time.
//! 2. From STX, the first TERM is searched for within `max_scan` bytes.
//! 3. A TERM yields a frame; scanning continues with the remainder.
//! 4. No TERM and the window is exhausted: the whole buffer is discarded.
//! 5. No TERM and the window is not yet full: the partial frame is kept
//!    for the next call.
//!
//! Each call does work proportional to the buffer size and never waits.

use tracing::{debug, trace};

use crate::types::{Frame, STX, TERM};

/// Default number of bytes scanned after STX before a frame is declared too long.
pub const DEFAULT_MAX_SCAN: usize = 1024;

/// Stateful splitter turning raw chunks into [`Frame`]s.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    max_scan: usize,
    noise_bytes: u64,
    overruns: u64,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Assembler with the default 1024 byte scan bound.
    pub fn new() -> Self {
        Self::with_max_scan(DEFAULT_MAX_SCAN)
    }

    /// Assembler with a custom scan bound (at least 1).
    pub fn with_max_scan(max_scan: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(256),
            max_scan: max_scan.max(1),
            noise_bytes: 0,
            overruns: 0,
        }
    }

    /// Append `bytes` and return every frame completed by them, in arrival order.
    pub fn ingest(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut start = 0usize;

        loop {
            // Skip noise up to the next STX
            match self.buffer[start..].iter().position(|&b| b == STX) {
                Some(offset) => {
                    self.noise_bytes += offset as u64;
                    start += offset;
                }
                None => {
                    self.noise_bytes += (self.buffer.len() - start) as u64;
                    start = self.buffer.len();
                    break;
                }
            }

            let available = self.buffer.len() - start - 1;
            let window = available.min(self.max_scan);
            let scan_from = start + 1;

            match self.buffer[scan_from..scan_from + window].iter().position(|&b| b == TERM) {
                Some(offset) => {
                    let end = scan_from + offset;
                    let frame = Frame::new(self.buffer[start..=end].to_vec());
                    trace!("Frame complete ({} bytes)", frame.len());
                    frames.push(frame);
                    start = end + 1;
                }
                None if available >= self.max_scan => {
                    debug!(
                        "No terminator within {} bytes, discarding {} buffered bytes",
                        self.max_scan,
                        self.buffer.len()
                    );
                    self.overruns += 1;
                    self.buffer.clear();
                    return frames;
                }
                None => break,
            }
        }

        self.buffer.drain(..start);
        frames
    }

    /// Drop all buffered bytes.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes currently held back waiting for a terminator.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no partial frame is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Scan bound in bytes.
    pub fn max_scan(&self) -> usize {
        self.max_scan
    }

    /// Bytes dropped because they did not start a frame.
    pub fn noise_bytes(&self) -> u64 {
        self.noise_bytes
    }

    /// Times the buffer was discarded for lack of a terminator.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}
