//! Traits for the two ends of the device link

use crate::Result;

/// Source of raw bytes read from the meter.
///
/// Providers handle their own timing: the serial provider waits on the port,
/// the replay provider paces chunks from a capture file.
#[async_trait::async_trait]
pub trait ByteSource: Send + 'static {
    /// Get the next chunk of bytes
    ///
    /// Returns:
    /// - `Ok(Some(chunk))` - Bytes available, in arrival order
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Transport failure, the source is unusable
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Short description of the source for logs.
    fn name(&self) -> &str;
}

/// Synchronous write path back to the meter.
pub trait CommandSink: Send + 'static {
    /// Write one complete command frame.
    fn write_frame(&mut self, frame: &[u8]) -> Result<()>;
}
