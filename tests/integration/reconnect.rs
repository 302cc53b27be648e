// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Integration tests for automatic reconnection over real WebSockets.
//!
//! A server-side disconnect is simulated with `RoomRegistry::disconnect_all`,
//! which closes every connection's frame channel and makes the server send
//! a close frame. A server that is not running at all is simulated by
//! reserving a port and releasing it before the client connects.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatline::controller::{STATUS_CONNECTED, STATUS_DISCONNECTED, STATUS_RECONNECTING};
use chatline::net::{self, NetConfig};
use chatline::view::ViewEvent;
use chatline_proto::room::RoomName;
use chatline_server::server::{self, CHAT_PATH, ServerState};
use tokio::sync::mpsc;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

fn config(addr: SocketAddr, username: &str) -> NetConfig {
    let url = Url::parse(&format!("ws://{addr}{CHAT_PATH}")).unwrap();
    NetConfig {
        reconnect_interval: Duration::from_millis(200),
        connect_timeout: Duration::from_secs(2),
        ..NetConfig::new(url, username)
    }
}

fn status(text: &str) -> ViewEvent {
    ViewEvent::Status(text.to_string())
}

async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<ViewEvent>,
    expected: &ViewEvent,
) -> Vec<ViewEvent> {
    let mut seen = Vec::new();
    tokio::time::timeout(WAIT, async {
        while let Some(event) = rx.recv().await {
            let done = event == *expected;
            seen.push(event);
            if done {
                return;
            }
        }
        panic!("view channel closed before {expected:?}");
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {expected:?}"));
    seen
}

#[tokio::test]
async fn reconnects_and_rejoins_after_server_closes_connection() {
    let state = Arc::new(ServerState::new());
    let (addr, _handle) = server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();

    let (client, mut rx) = net::spawn_net(&config(addr, "alice"));
    wait_for(&mut rx, &status("alice has joined the room.")).await;

    assert_eq!(state.rooms.disconnect_all().await, 1);

    wait_for(&mut rx, &status(STATUS_DISCONNECTED)).await;
    let seen = wait_for(&mut rx, &status("alice has joined the room.")).await;
    assert_eq!(
        seen,
        [
            status(STATUS_RECONNECTING),
            ViewEvent::MembersCleared,
            status(STATUS_CONNECTED),
            ViewEvent::MemberAdded("alice".into()),
            status("alice has joined the room."),
        ]
    );
    assert_eq!(state.rooms.members(&RoomName::general()).await, ["alice"]);

    client.dispose().await;
}

#[tokio::test]
async fn reconnect_returns_to_default_room() {
    let state = Arc::new(ServerState::new());
    let (addr, _handle) = server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();

    let (client, mut rx) = net::spawn_net(&config(addr, "alice"));
    wait_for(&mut rx, &status("alice has joined the room.")).await;

    let random = RoomName::new("random").unwrap();
    client.change_room(random.clone()).await;
    wait_for(&mut rx, &status("alice has joined the room.")).await;
    assert_eq!(state.rooms.members(&random).await, ["alice"]);

    state.rooms.disconnect_all().await;
    wait_for(&mut rx, &status(STATUS_CONNECTED)).await;
    wait_for(&mut rx, &status("alice has joined the room.")).await;

    assert_eq!(state.rooms.members(&RoomName::general()).await, ["alice"]);
    assert!(state.rooms.members(&random).await.is_empty());

    client.dispose().await;
}

#[tokio::test]
async fn keeps_retrying_until_server_comes_up() {
    // Reserve a port, then free it so the first attempts are refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (client, mut rx) = net::spawn_net(&config(addr, "alice"));
    wait_for(&mut rx, &status(STATUS_DISCONNECTED)).await;
    wait_for(&mut rx, &status(STATUS_RECONNECTING)).await;
    wait_for(&mut rx, &status(STATUS_DISCONNECTED)).await;

    let (_bound, _handle) = server::start_server(&addr.to_string()).await.unwrap();

    wait_for(&mut rx, &status(STATUS_CONNECTED)).await;
    wait_for(&mut rx, &status("alice has joined the room.")).await;

    client.dispose().await;
}

#[tokio::test]
async fn other_members_see_leave_then_join_across_reconnect() {
    let state = Arc::new(ServerState::new());
    let (addr, _handle) = server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();

    let (alice, mut alice_rx) = net::spawn_net(&config(addr, "alice"));
    wait_for(&mut alice_rx, &status("alice has joined the room.")).await;
    let (bob, mut bob_rx) = net::spawn_net(&config(addr, "bob"));
    wait_for(&mut bob_rx, &status("bob has joined the room.")).await;
    wait_for(&mut alice_rx, &status("bob has joined the room.")).await;

    // Both connections drop; both clients come back on their own.
    state.rooms.disconnect_all().await;
    wait_for(&mut alice_rx, &status(STATUS_RECONNECTING)).await;
    wait_for(&mut bob_rx, &status(STATUS_RECONNECTING)).await;

    tokio::time::timeout(WAIT, async {
        loop {
            let mut members = state.rooms.members(&RoomName::general()).await;
            members.sort();
            if members == ["alice", "bob"] {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("both users should be back in general");

    alice.dispose().await;
    bob.dispose().await;
}
