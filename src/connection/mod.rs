//! Session handle over a running bridge task

use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::driver::{Control, Driver, DriverChannels, DriverOptions};
use crate::forwarder::DatagramSink;
use crate::pipeline::PipelineStats;
use crate::provider::{ByteSource, CommandSink};
use crate::stream::ThrottleExt;
use crate::types::{StreamState, TelemetryRecord, UpdateRate};
use crate::{BridgeError, Result};


/// A running bridge between one byte source and one UDP destination.
///
/// Dropping the session cancels the bridge task; if it was streaming, the
/// task sends the stop command on its way out.
pub struct Session {
    /// Latest forwarded record
    records: watch::Receiver<Option<Arc<TelemetryRecord>>>,

    /// Pipeline counters
    stats: watch::Receiver<PipelineStats>,

    /// Lifecycle
    state: watch::Receiver<StreamState>,

    /// Start/stop requests
    control: mpsc::Sender<Control>,

    /// Cancellation token for stopping the task
    cancel: CancellationToken,

    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Spawn a bridge over the given parts. The session starts idle.
    pub fn with_parts<S, C, D>(source: S, commands: C, sink: D, options: DriverOptions) -> Self
    where
        S: ByteSource,
        C: CommandSink,
        D: DatagramSink,
    {
        Self::from_channels(Driver::spawn(source, commands, sink, options))
    }

    fn from_channels(channels: DriverChannels) -> Self {
        Self {
            records: channels.records,
            stats: channels.stats,
            state: channels.state,
            control: channels.control,
            cancel: channels.cancel,
            task: Some(channels.task),
        }
    }

    /// Send the start command and begin forwarding.
    ///
    /// Also used to resume after [`StreamState::Halted`] or
    /// [`StreamState::Stopped`].
    pub async fn start(&self) -> Result<()> {
        self.request(Control::Start).await
    }

    /// Send the stop command and stop forwarding.
    pub async fn stop(&self) -> Result<()> {
        self.request(Control::Stop).await
    }

    async fn request(&self, make: fn(oneshot::Sender<Result<()>>) -> Control) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.control
            .send(make(reply_tx))
            .await
            .map_err(|_| {
                BridgeError::session(format!("bridge is not running ({})", self.state()))
            })?;
        reply_rx.await.map_err(|_| BridgeError::session("bridge exited before replying"))?
    }

    /// Subscribe to forwarded records
    ///
    /// The stream yields the latest record first, if any, and ends when the
    /// bridge task exits.
    pub fn subscribe(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = Arc<TelemetryRecord>> + 'static {
        let records = WatchStream::new(self.records.clone()).filter_map(|opt| async move { opt });

        match rate.min_interval() {
            None => records.boxed(),
            Some(interval) => records.throttle(interval).boxed(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    /// Lifecycle changes as a stream, starting with the current state.
    pub fn state_updates(&self) -> impl Stream<Item = StreamState> + 'static {
        WatchStream::new(self.state.clone())
    }

    /// Current pipeline counters.
    pub fn stats(&self) -> PipelineStats {
        *self.stats.borrow()
    }

    /// Counter updates as a stream, one item per processed chunk at most.
    pub fn stats_updates(&self) -> impl Stream<Item = PipelineStats> + 'static {
        WatchStream::new(self.stats.clone())
    }

    /// Latest forwarded record.
    pub fn latest(&self) -> Option<Arc<TelemetryRecord>> {
        self.records.borrow().clone()
    }

    /// Wait until the bridge task exits, returning its final state.
    pub async fn closed(&self) -> StreamState {
        let mut state = self.state.clone();
        loop {
            if state.borrow_and_update().is_terminal() {
                break;
            }
            if state.changed().await.is_err() {
                break;
            }
        }
        state.borrow().clone()
    }

    /// Stop streaming if needed, then end the bridge task and wait for it.
    pub async fn shutdown(mut self) -> Result<StreamState> {
        let result = if self.state().is_streaming() { self.stop().await } else { Ok(()) };

        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.await.map_err(|e| {
                BridgeError::transport_failed_with_source("bridge task panicked", Box::new(e))
            })?;
        }

        info!("Session closed ({})", self.state());
        result.map(|()| self.state())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("Dropping session");
        self.cancel.cancel();
    }
}
