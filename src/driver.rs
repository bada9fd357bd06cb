//! Driver spawns and manages the bridge task

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::forwarder::{DatagramSink, Forwarder};
use crate::pipeline::{FrameObserver, Pipeline, PipelineStats};
use crate::protocol::{DEFAULT_MAX_SCAN, FrameAssembler, StreamCommand};
use crate::provider::{ByteSource, CommandSink};
use crate::types::{StreamState, TelemetryRecord};
use crate::{BridgeError, Result};

/// Pending control requests before senders wait.
const CONTROL_CAPACITY: usize = 8;

/// Request from a session handle to the driver task.
#[derive(Debug)]
pub enum Control {
    /// Send the start command and forward records
    Start(oneshot::Sender<Result<()>>),
    /// Send the stop command and stop forwarding
    Stop(oneshot::Sender<Result<()>>),
}

/// Tuning for a driver task.
#[derive(Clone)]
pub struct DriverOptions {
    /// Bytes scanned for a terminator before the buffer is discarded
    pub max_scan: usize,
    /// How many times each control frame is written
    pub command_repeat: u8,
    /// Send the start command before reading the first chunk
    pub auto_start: bool,
    /// Optional hook for dropped frames
    pub observer: Option<Arc<dyn FrameObserver>>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self { max_scan: DEFAULT_MAX_SCAN, command_repeat: 2, auto_start: false, observer: None }
    }
}

impl std::fmt::Debug for DriverOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverOptions")
            .field("max_scan", &self.max_scan)
            .field("command_repeat", &self.command_repeat)
            .field("auto_start", &self.auto_start)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Latest forwarded record
    pub records: watch::Receiver<Option<Arc<TelemetryRecord>>>,
    /// Pipeline counters, updated after every chunk
    pub stats: watch::Receiver<PipelineStats>,
    /// Session lifecycle
    pub state: watch::Receiver<StreamState>,
    /// Start/stop requests
    pub control: mpsc::Sender<Control>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// The driver task itself
    pub task: JoinHandle<()>,
}

/// Driver spawns the single task that owns the byte path
///
/// The task owns the pipeline, the command sink and the forwarder, so no
/// state is shared and nothing is locked. Cancellation, control requests and
/// byte chunks are served in that priority order, one at a time.
pub struct Driver;

impl Driver {
    /// Spawn the driver task
    ///
    /// The task starts in [`StreamState::Idle`] unless `options.auto_start`
    /// is set, in which case the start command goes out before any byte is
    /// read.
    pub fn spawn<S, C, D>(source: S, commands: C, sink: D, options: DriverOptions) -> DriverChannels
    where
        S: ByteSource,
        C: CommandSink,
        D: DatagramSink,
    {
        let (records_tx, records_rx) = watch::channel(None);
        let (stats_tx, stats_rx) = watch::channel(PipelineStats::default());
        let (state_tx, state_rx) = watch::channel(StreamState::Idle);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);
        let cancel = CancellationToken::new();

        let mut pipeline = Pipeline::new(FrameAssembler::with_max_scan(options.max_scan));
        if let Some(observer) = options.observer {
            pipeline = pipeline.with_observer(observer);
        }

        let task = BridgeTask {
            pipeline,
            commands,
            forwarder: Forwarder::new(sink),
            command_repeat: options.command_repeat.max(1),
            records_tx,
            stats_tx,
            state_tx,
        };

        let auto_start = options.auto_start;
        let cancel_task = cancel.clone();
        let task = tokio::spawn(async move {
            task.run(source, control_rx, cancel_task, auto_start).await;
        });

        DriverChannels {
            records: records_rx,
            stats: stats_rx,
            state: state_rx,
            control: control_tx,
            cancel,
            task,
        }
    }
}

struct BridgeTask<C, D> {
    pipeline: Pipeline,
    commands: C,
    forwarder: Forwarder<D>,
    command_repeat: u8,
    records_tx: watch::Sender<Option<Arc<TelemetryRecord>>>,
    stats_tx: watch::Sender<PipelineStats>,
    state_tx: watch::Sender<StreamState>,
}

impl<C: CommandSink, D: DatagramSink> BridgeTask<C, D> {
    async fn run<S: ByteSource>(
        mut self,
        mut source: S,
        mut control: mpsc::Receiver<Control>,
        cancel: CancellationToken,
        auto_start: bool,
    ) {
        info!("Bridge task started on {}", source.name());
        let mut chunks = 0u64;

        if auto_start {
            if let Err(e) = self.start_streaming() {
                error!("Start command failed: {}", e);
                self.set_state(StreamState::Failed { reason: e.to_string() });
                return;
            }
        }

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Bridge task cancelled");
                    if self.streaming() {
                        // Best effort, the caller is going away
                        if let Err(e) = self.send_command(StreamCommand::Stop) {
                            warn!("Stop command on cancel failed: {}", e);
                        }
                        self.set_state(StreamState::Stopped);
                    }
                    break;
                }

                Some(request) = control.recv() => self.handle_control(request),

                result = source.next_chunk() => match result {
                    Ok(Some(chunk)) => {
                        chunks += 1;
                        trace!("Chunk {}: {} bytes", chunks, chunk.len());
                        self.handle_chunk(&chunk).await;
                    }
                    Ok(None) => {
                        info!("Source {} ended after {} chunks", source.name(), chunks);
                        if self.streaming() {
                            if let Err(e) = self.send_command(StreamCommand::Stop) {
                                warn!("Stop command after source end failed: {}", e);
                            }
                        }
                        self.set_state(StreamState::Ended);
                        break;
                    }
                    Err(e) => {
                        error!("Source {} failed: {}", source.name(), e);
                        self.set_state(StreamState::Failed { reason: e.to_string() });
                        break;
                    }
                },
            }
        }

        let stats = self.pipeline.stats();
        info!(
            "Bridge task ended ({} records forwarded, {} frames discarded)",
            self.forwarder.sent(),
            stats.discarded()
        );
    }

    fn handle_control(&mut self, request: Control) {
        match request {
            Control::Start(reply) => {
                let _ = reply.send(self.start_streaming());
            }
            Control::Stop(reply) => {
                let result = self.send_command(StreamCommand::Stop);
                if result.is_ok() {
                    info!("Streaming stopped");
                    self.set_state(StreamState::Stopped);
                }
                let _ = reply.send(result);
            }
        }
    }

    fn start_streaming(&mut self) -> Result<()> {
        // A fresh stream must not complete a frame left over from before
        self.pipeline.reset();
        self.send_command(StreamCommand::Start)?;
        info!("Streaming started");
        self.set_state(StreamState::Streaming);
        Ok(())
    }

    async fn handle_chunk(&mut self, chunk: &[u8]) {
        let records = self.pipeline.ingest(chunk);

        for record in records {
            if !self.streaming() {
                trace!("Not streaming, dropping record");
                continue;
            }
            match self.forwarder.forward(&record).await {
                Ok(()) => {
                    self.records_tx.send_replace(Some(Arc::new(record)));
                }
                Err(e) => self.halt(e),
            }
        }

        self.stats_tx.send_replace(self.pipeline.stats());
    }

    /// Stop the device and drop buffered input after a fatal forwarding error.
    fn halt(&mut self, cause: BridgeError) {
        warn!("Halting stream: {}", cause);
        if let Err(e) = self.send_command(StreamCommand::Stop) {
            warn!("Stop command after halt failed: {}", e);
        }
        self.pipeline.reset();
        self.set_state(StreamState::Halted { reason: cause.to_string() });
    }

    fn send_command(&mut self, command: StreamCommand) -> Result<()> {
        let frame = command.encode();
        for _ in 0..self.command_repeat {
            self.commands.write_frame(&frame)?;
        }
        debug!("Sent {} x{}", command, self.command_repeat);
        Ok(())
    }

    fn streaming(&self) -> bool {
        self.state_tx.borrow().is_streaming()
    }

    fn set_state(&self, state: StreamState) {
        debug!("State -> {}", state);
        self.state_tx.send_replace(state);
    }
}
