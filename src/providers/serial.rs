//! Serial port provider
//!
//! The port is read on a dedicated blocking thread that forwards chunks
//! through a bounded channel, so datagram sends on the async side never
//! delay byte reception. Writes go through a cloned port handle.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::SerialConfig;
use crate::provider::{ByteSource, CommandSink};
use crate::{BridgeError, Result};

/// Chunks buffered between the reader thread and the driver.
const CHANNEL_CAPACITY: usize = 64;

const READ_BUFFER_SIZE: usize = 256;

type ChunkResult = std::result::Result<Vec<u8>, std::io::Error>;

/// Bytes read from a serial port by a background thread.
pub struct SerialProvider {
    name: String,
    chunks: mpsc::Receiver<ChunkResult>,
    cancel: CancellationToken,
    reader: Option<JoinHandle<()>>,
}

impl SerialProvider {
    /// Open the port as 8N1 without flow control.
    ///
    /// Returns the reading half and a command sink sharing the same port.
    pub fn open(settings: &SerialConfig) -> Result<(Self, SerialCommandSink)> {
        let port = serialport::new(&settings.port, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout())
            .open()
            .map_err(|e| BridgeError::serial(&settings.port, e))?;

        let writer = port.try_clone().map_err(|e| BridgeError::serial(&settings.port, e))?;

        info!("Opened serial port: {} at {} baud", settings.port, settings.baud_rate);

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let thread_cancel = cancel.clone();
        let reader = std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || read_loop(port, tx, thread_cancel))?;

        let provider =
            Self { name: settings.port.clone(), chunks: rx, cancel, reader: Some(reader) };
        let sink = SerialCommandSink { name: settings.port.clone(), port: writer };
        Ok((provider, sink))
    }
}

fn read_loop(
    mut port: Box<dyn SerialPort>,
    tx: mpsc::Sender<ChunkResult>,
    cancel: CancellationToken,
) {
    debug!("Serial reader thread started");
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    while !cancel.is_cancelled() {
        match port.read(&mut buffer) {
            Ok(0) => continue,
            Ok(n) => {
                trace!("Read {} bytes from serial port", n);
                if tx.blocking_send(Ok(buffer[..n].to_vec())).is_err() {
                    break;
                }
            }
            // The read timeout only bounds how long we wait before checking cancellation
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                continue;
            }
            Err(e) => {
                error!("Serial read failed: {}", e);
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
    debug!("Serial reader thread stopped");
}

#[async_trait::async_trait]
impl ByteSource for SerialProvider {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.chunks.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(BridgeError::transport_failed_with_source(
                format!("read from {} failed", self.name),
                Box::new(e),
            )),
            // The reader thread only exits without an error when cancelled
            None => Err(BridgeError::transport_failed(format!(
                "reader for {} stopped",
                self.name
            ))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SerialProvider {
    fn drop(&mut self) {
        self.cancel.cancel();
        // Unblock a reader waiting on a full channel
        self.chunks.close();
        if let Some(reader) = self.reader.take() {
            debug!("Waiting for serial reader of {} to exit", self.name);
            let _ = reader.join();
        }
    }
}

/// Write half of the serial port.
pub struct SerialCommandSink {
    name: String,
    port: Box<dyn SerialPort>,
}

impl CommandSink for SerialCommandSink {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.port.write_all(frame).and_then(|()| self.port.flush()).map_err(|e| {
            BridgeError::transport_failed_with_source(
                format!("write to {} failed", self.name),
                Box::new(e),
            )
        })
    }
}

impl std::fmt::Debug for SerialCommandSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialCommandSink").field("port", &self.name).finish()
    }
}
