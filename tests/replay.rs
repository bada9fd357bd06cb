//! Capture replay end to end over a loopback UDP socket

use futures::StreamExt;
use powermaster::{BridgeConfig, PowerMaster, StreamState, UpdateRate};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn capture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data").join("captures").join(name)
}

async fn receiver() -> (UdpSocket, BridgeConfig) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind loopback");
    let mut config = BridgeConfig::default();
    config.endpoint.host = "127.0.0.1".to_string();
    config.endpoint.port = socket.local_addr().unwrap().port();
    (socket, config)
}

async fn recv_text(socket: &UdpSocket) -> String {
    let mut buf = [0u8; 512];
    let (n, _) = timeout(WAIT, socket.recv_from(&mut buf))
        .await
        .expect("datagram should arrive")
        .expect("recv");
    String::from_utf8(buf[..n].to_vec()).expect("datagrams are ASCII")
}

#[tokio::test]
async fn replayed_capture_is_forwarded_in_order() {
    let (socket, config) = receiver().await;

    let session = PowerMaster::replay(capture("session.hex"), &config, Duration::from_millis(1), 7)
        .await
        .expect("replay should open");

    assert_eq!(
        recv_text(&socket).await,
        "vswr_read:true:forward:120.0:reflected:0.5:vswr:1.05:vswr_alarm:true:low_power_alarm:false:high_power_alarm:false:red_led:true:yellow_led:false"
    );
    assert_eq!(recv_text(&socket).await, "vswr_read:true:forward:100.0:reflected:2.5:vswr:1.38");
    assert_eq!(
        recv_text(&socket).await,
        "vswr_read:true:forward:50.0:reflected:1.0:vswr:1.33:vswr_alarm:false:low_power_alarm:false:high_power_alarm:false:red_led:false:yellow_led:true"
    );

    assert_eq!(timeout(WAIT, session.closed()).await.unwrap(), StreamState::Ended);

    let stats = session.stats();
    assert_eq!(stats.records, 3);
    assert_eq!(stats.ignored, 2);
    assert_eq!(stats.checksum_mismatch, 1);
    assert_eq!(stats.noise_bytes, 3);
}

#[tokio::test]
async fn subscription_ends_with_replay() {
    let (_socket, config) = receiver().await;

    let session = PowerMaster::replay(capture("session.hex"), &config, Duration::from_millis(1), 64)
        .await
        .expect("replay should open");
    let records = session.subscribe(UpdateRate::Native);

    let seen: Vec<_> = timeout(WAIT, records.collect::<Vec<_>>()).await.unwrap();
    assert!(!seen.is_empty());
    assert_eq!(seen.last().unwrap().forward_power, 50.0);

    assert_eq!(session.shutdown().await.unwrap(), StreamState::Ended);
}

#[tokio::test]
async fn missing_capture_is_reported() {
    let (_socket, config) = receiver().await;

    let err = PowerMaster::replay(capture("missing.hex"), &config, Duration::from_millis(1), 7)
        .await
        .err()
        .expect("missing capture must fail");
    assert!(!err.recovery_suggestions().is_empty());
}

#[tokio::test]
async fn live_mode_requires_a_serial_port() {
    let (_socket, config) = receiver().await;

    let err = PowerMaster::connect(&config).await.err().expect("no port configured");
    assert!(matches!(err, powermaster::BridgeError::Config { .. }));
}
