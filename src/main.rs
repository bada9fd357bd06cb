use anyhow::{Context, Result, bail};
use clap::Parser;
use powermaster::{BridgeConfig, PowerMaster, Session, StreamState};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// powermaster-udp: forward PowerMaster power/SWR telemetry as UDP datagrams.
///
/// Positional arguments override the configuration file.
#[derive(Parser, Debug)]
#[command(name = "powermaster-udp", version)]
struct Cli {
    /// Endpoint IP address or host name
    endpoint_ip: Option<String>,
    /// Endpoint UDP port
    endpoint_port: Option<u16>,
    /// Serial port of the meter, e.g. COM3 or /dev/ttyUSB0
    com: Option<String>,
    /// Serial baud rate
    baud: Option<u32>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Play back a capture file instead of opening the serial port
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Delay between replayed chunks in milliseconds
    #[arg(long, default_value_t = 50)]
    replay_interval_ms: u64,

    /// Bytes per replayed chunk
    #[arg(long, default_value_t = 7)]
    replay_chunk: usize,

    /// Log filter directive, e.g. `debug` or `powermaster=trace` (RUST_LOG wins)
    #[arg(long)]
    log_filter: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::default(),
        };

        if let Some(host) = &self.endpoint_ip {
            config.endpoint.host = host.clone();
        }
        if let Some(port) = self.endpoint_port {
            config.endpoint.port = port;
        }
        if let Some(com) = &self.com {
            config.serial.port = com.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(filter) = &self.log_filter {
            config.logging.filter = filter.clone();
        }
        Ok(config)
    }
}

fn init_logging(filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter)
            .with_context(|| format!("invalid log filter {filter:?}"))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

/// Resolves when a line is read from stdin; never resolves on EOF.
///
/// Stdin is read on a plain thread so a pending read cannot hold up runtime
/// shutdown.
fn enter_pressed() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(());
        }
    });
    rx
}

async fn open_session(cli: &Cli, config: &BridgeConfig) -> Result<Session> {
    let session = match &cli.replay {
        Some(path) => {
            let pace = Duration::from_millis(cli.replay_interval_ms);
            PowerMaster::replay(path, config, pace, cli.replay_chunk)
                .await
                .with_context(|| format!("failed to replay {}", path.display()))?
        }
        None => PowerMaster::connect(config).await.with_context(|| {
            format!("failed to open {} at {} baud", config.serial.port, config.serial.baud_rate)
        })?,
    };
    Ok(session)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_logging(&config.logging.filter)?;

    let session = match open_session(&cli, &config).await {
        Ok(session) => session,
        Err(e) => {
            for suggestion in e
                .downcast_ref::<powermaster::BridgeError>()
                .map(|b| b.recovery_suggestions())
                .unwrap_or_default()
            {
                warn!("  - {}", suggestion);
            }
            return Err(e);
        }
    };

    println!(
        "Forwarding to {}:{}, press Enter to stop",
        config.endpoint.host, config.endpoint.port
    );

    tokio::select! {
        Ok(()) = enter_pressed() => info!("Stop requested"),
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("Interrupted");
        }
        state = session.closed() => info!("Source finished: {}", state),
    }

    let stats = session.stats();
    let final_state = session.shutdown().await.context("failed to stop streaming")?;

    info!(
        "{} bytes, {} frames, {} records, {} ignored, {} discarded",
        stats.bytes_received,
        stats.frames,
        stats.records,
        stats.ignored,
        stats.discarded()
    );

    if let StreamState::Failed { reason } = final_state {
        bail!("telemetry source failed: {reason}");
    }
    Ok(())
}
