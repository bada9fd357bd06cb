//! Telemetry forwarding to the UDP status feed
//!
//! Each record becomes one ASCII datagram:
//!
//! ```text
//! vswr_read:<b>:forward:<d.d>:reflected:<d.d>:vswr:<d.dd>[:vswr_alarm:<b>:low_power_alarm:<b>:high_power_alarm:<b>:red_led:<b>:yellow_led:<b>]
//! ```
//!
//! Sends are fire-and-forget. A failed send is not retried; it is returned
//! as [`BridgeError::Forwarding`] so the driver can halt the session.

use std::fmt::Write as _;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::types::TelemetryRecord;
use crate::{BridgeError, Result};

/// Render a record in the wire text format.
pub fn format_record(record: &TelemetryRecord) -> String {
    let mut text = String::with_capacity(160);
    // Writing into a String cannot fail
    let _ = write!(
        text,
        "vswr_read:{}:forward:{:.1}:reflected:{:.1}:vswr:{:.2}",
        record.vswr_valid, record.forward_power, record.reflected_power, record.vswr
    );
    if let Some(status) = &record.status {
        let _ = write!(
            text,
            ":vswr_alarm:{}:low_power_alarm:{}:high_power_alarm:{}:red_led:{}:yellow_led:{}",
            status.vswr_alarm,
            status.low_power_alarm,
            status.high_power_alarm,
            status.red_led,
            status.yellow_led
        );
    }
    text
}

/// Destination for formatted datagrams.
#[async_trait::async_trait]
pub trait DatagramSink: Send + 'static {
    /// Send one datagram.
    async fn send(&mut self, datagram: &[u8]) -> std::io::Result<()>;

    /// Human readable destination, used in logs and errors.
    fn destination(&self) -> String;
}

/// UDP socket bound to an ephemeral port, sending to one fixed endpoint.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    /// Resolve `host:port` once and bind a matching local socket.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let endpoint = format!("{host}:{port}");
        let target = tokio::net::lookup_host(&endpoint)
            .await
            .map_err(|e| BridgeError::forwarding(&endpoint, e))?
            .next()
            .ok_or_else(|| {
                BridgeError::forwarding(
                    &endpoint,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "host did not resolve"),
                )
            })?;

        let bind_addr = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket =
            UdpSocket::bind(bind_addr).await.map_err(|e| BridgeError::forwarding(&endpoint, e))?;

        info!("UDP feed ready: {} -> {}", socket.local_addr()?, target);
        Ok(Self { socket, target })
    }

    /// Resolved destination address.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait::async_trait]
impl DatagramSink for UdpSink {
    async fn send(&mut self, datagram: &[u8]) -> std::io::Result<()> {
        self.socket.send_to(datagram, self.target).await.map(|_| ())
    }

    fn destination(&self) -> String {
        self.target.to_string()
    }
}

/// Formats records and hands them to a [`DatagramSink`].
#[derive(Debug)]
pub struct Forwarder<D> {
    sink: D,
    sent: u64,
}

impl<D: DatagramSink> Forwarder<D> {
    pub fn new(sink: D) -> Self {
        Self { sink, sent: 0 }
    }

    /// Format `record` and send it as one datagram.
    pub async fn forward(&mut self, record: &TelemetryRecord) -> Result<()> {
        let text = format_record(record);
        match self.sink.send(text.as_bytes()).await {
            Ok(()) => {
                self.sent += 1;
                trace!("Forwarded #{}: {}", self.sent, text);
                Ok(())
            }
            Err(e) => {
                debug!("Send to {} failed after {} datagrams", self.sink.destination(), self.sent);
                Err(BridgeError::forwarding(self.sink.destination(), e))
            }
        }
    }

    /// Datagrams sent successfully.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }
}
