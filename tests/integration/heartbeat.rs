// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Timer behavior of the session driver under a paused tokio clock.
//!
//! The loopback transport lets each test decide exactly when connections
//! open and close, so heartbeat and reconnect ticks can be counted against
//! simulated time without any network.

use std::time::Duration;

use chatline::net::{ChatClient, NetConfig};
use chatline::transport::TransportError;
use chatline::transport::loopback::{LoopbackConnection, LoopbackTransport};
use chatline_proto::room::RoomName;
use url::Url;

fn config() -> NetConfig {
    NetConfig::new(Url::parse("ws://127.0.0.1:8000/v1/chat").unwrap(), "alice")
}

fn pings(conn: &LoopbackConnection) -> usize {
    conn.sent_frames()
        .iter()
        .filter(|f| f.starts_with(r#"{"type":"ping""#))
        .count()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn pings_every_ten_seconds_while_open() {
    let transport = LoopbackTransport::auto_open();
    let (client, _view) = ChatClient::spawn(transport.clone(), &config());
    settle().await;
    let conn = transport.latest().unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(pings(&conn), 6);

    client.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn pings_carry_the_current_room() {
    let transport = LoopbackTransport::auto_open();
    let (client, _view) = ChatClient::spawn(transport.clone(), &config());
    settle().await;
    let conn = transport.latest().unwrap();

    client.change_room(RoomName::new("random").unwrap()).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(
        conn.sent_frames().last().map(String::as_str),
        Some(r#"{"type":"ping","room_name":"random"}"#)
    );
    client.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn ticks_during_connecting_do_not_burst_after_open() {
    let transport = LoopbackTransport::new();
    let (client, _view) = ChatClient::spawn(transport.clone(), &config());
    settle().await;
    let conn = transport.latest().unwrap();

    // Three heartbeat periods pass before the connection opens.
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert!(conn.sent_frames().is_empty());

    conn.open();
    settle().await;
    assert_eq!(
        conn.sent_frames(),
        [r#"{"type":"join","room_name":"general"}"#]
    );

    // Next ping only at the next scheduled tick (t = 40s).
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(pings(&conn), 1);

    client.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn no_pings_while_closed() {
    let transport = LoopbackTransport::new();
    let (client, _view) = ChatClient::spawn(transport.clone(), &config());
    settle().await;
    let conn = transport.latest().unwrap();
    conn.open();
    settle().await;
    let _ = conn.sent_frames();

    conn.close();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(pings(&conn), 0);

    client.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn closed_connection_is_replaced_on_reconnect_poll() {
    let transport = LoopbackTransport::new();
    let (client, _view) = ChatClient::spawn(transport.clone(), &config());
    settle().await;

    transport
        .latest()
        .unwrap()
        .fail(TransportError::Unreachable("ws://127.0.0.1:8000".into()));
    settle().await;
    assert_eq!(transport.connection_count(), 1);

    // First reconnect poll at t = 3s.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(transport.connection_count(), 2);

    // A connection that is still connecting is never replaced.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.connection_count(), 2);

    client.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn nothing_fires_after_dispose() {
    let transport = LoopbackTransport::auto_open();
    let (client, _view) = ChatClient::spawn(transport.clone(), &config());
    settle().await;
    let conn = transport.latest().unwrap();
    let _ = conn.sent_frames();

    client.dispose().await;
    conn.close();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(pings(&conn), 0);
    assert_eq!(transport.connection_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_reconnect_interval_still_replaces_closed_session() {
    let transport = LoopbackTransport::auto_open();
    let config = NetConfig {
        reconnect_interval: Duration::ZERO,
        ..config()
    };
    let (client, _view) = ChatClient::spawn(transport.clone(), &config);
    settle().await;

    transport.latest().unwrap().close();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(transport.connection_count(), 2);

    // The replacement opened; a second close is healed again.
    transport.latest().unwrap().close();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(transport.connection_count(), 3);

    client.dispose().await;
}
