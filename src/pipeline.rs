//! Inbound byte path: assembly, validation and decoding in one place
//!
//! [`Pipeline::ingest`] is the only entry point for raw bytes. It never
//! fails: every malformed frame is dropped, counted in [`PipelineStats`]
//! and, when installed, reported to a [`FrameObserver`]. One bad frame
//! never costs the frames that follow it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::FrameError;
use crate::protocol::{Decoded, FrameAssembler, decode};
use crate::types::{Frame, TelemetryRecord};

/// Counters describing what the pipeline has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub bytes_received: u64,
    pub noise_bytes: u64,
    pub frames: u64,
    pub records: u64,
    pub ignored: u64,
    pub missing_delimiter: u64,
    pub checksum_mismatch: u64,
    pub malformed_checksum: u64,
    pub payload_parse_failure: u64,
    pub frames_too_long: u64,
}

impl PipelineStats {
    /// Total frames or buffers thrown away for any reason.
    pub fn discarded(&self) -> u64 {
        self.missing_delimiter
            + self.checksum_mismatch
            + self.malformed_checksum
            + self.payload_parse_failure
            + self.frames_too_long
    }

    fn count(&mut self, error: &FrameError) {
        match error {
            FrameError::MissingDelimiter => self.missing_delimiter += 1,
            FrameError::ChecksumMismatch { .. } => self.checksum_mismatch += 1,
            FrameError::MalformedChecksum { .. } => self.malformed_checksum += 1,
            FrameError::PayloadParseFailure { .. } => self.payload_parse_failure += 1,
            FrameError::FrameTooLong { .. } => self.frames_too_long += 1,
        }
    }
}

/// Optional hook for visibility into dropped input.
///
/// Called synchronously from the ingestion path, so implementations should
/// be cheap (bump a counter, push to a channel).
pub trait FrameObserver: Send + Sync {
    /// A frame (or, for [`FrameError::FrameTooLong`], a whole buffer) was dropped.
    fn on_discard(&self, error: &FrameError, frame: Option<&Frame>);

    /// A valid frame carried a tag other than the report tag.
    fn on_ignored(&self, _tag: &str) {}
}

/// Assembler plus decoder with discard accounting.
pub struct Pipeline {
    assembler: FrameAssembler,
    stats: PipelineStats,
    observer: Option<Arc<dyn FrameObserver>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(FrameAssembler::new())
    }
}

impl Pipeline {
    /// Create a pipeline around an assembler.
    pub fn new(assembler: FrameAssembler) -> Self {
        Self { assembler, stats: PipelineStats::default(), observer: None }
    }

    /// Install an observer for discarded and ignored frames.
    pub fn with_observer(mut self, observer: Arc<dyn FrameObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Feed raw bytes and collect the records they complete.
    pub fn ingest(&mut self, bytes: &[u8]) -> Vec<TelemetryRecord> {
        self.stats.bytes_received += bytes.len() as u64;

        let overruns_before = self.assembler.overruns();
        let frames = self.assembler.ingest(bytes);
        self.stats.noise_bytes = self.assembler.noise_bytes();

        let mut records = Vec::with_capacity(frames.len());
        for frame in frames {
            self.stats.frames += 1;
            match decode(&frame) {
                Ok(Decoded::Telemetry(record)) => {
                    self.stats.records += 1;
                    trace!(?record, "Report decoded");
                    records.push(record);
                }
                Ok(Decoded::Ignored { tag }) => {
                    self.stats.ignored += 1;
                    trace!("Ignoring frame with tag {:?}", tag);
                    if let Some(observer) = &self.observer {
                        observer.on_ignored(&tag);
                    }
                }
                Err(error) => self.discard(error, Some(&frame)),
            }
        }

        // An overrun always happens after the last complete frame of the chunk
        if self.assembler.overruns() > overruns_before {
            self.discard(FrameError::FrameTooLong { scanned: self.assembler.max_scan() }, None);
        }
        records
    }

    /// Drop any partially assembled frame.
    pub fn reset(&mut self) {
        self.assembler.reset();
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Bytes buffered while waiting for a terminator.
    pub fn buffered(&self) -> usize {
        self.assembler.len()
    }

    fn discard(&mut self, error: FrameError, frame: Option<&Frame>) {
        self.stats.count(&error);
        match frame {
            Some(frame) => debug!(reason = error.label(), "Dropping frame {:?}: {}", frame, error),
            None => debug!(reason = error.label(), "Dropping buffer: {}", error),
        }
        if let Some(observer) = &self.observer {
            observer.on_discard(&error, frame);
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("assembler", &self.assembler)
            .field("stats", &self.stats)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
