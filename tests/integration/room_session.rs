// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! End-to-end chat sessions against the in-process room server.
//!
//! Each test starts `chatline-server` on `127.0.0.1:0` and drives one or
//! more `ChatClient`s over real WebSockets, observing only what their views
//! receive.

use std::net::SocketAddr;
use std::time::Duration;

use chatline::controller::STATUS_CONNECTED;
use chatline::net::{self, ChatClient, NetConfig};
use chatline::view::ViewEvent;
use chatline_proto::room::RoomName;
use chatline_server::server::{self, CHAT_PATH};
use tokio::sync::mpsc;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> SocketAddr {
    let (addr, _handle) = server::start_server("127.0.0.1:0").await.unwrap();
    addr
}

fn config(addr: SocketAddr, username: &str) -> NetConfig {
    let url = Url::parse(&format!("ws://{addr}{CHAT_PATH}")).unwrap();
    NetConfig::new(url, username)
}

/// Receive view events until one equals `expected`, returning everything
/// seen along the way (inclusive).
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
        panic!("view channel closed before {expected:?}; saw {seen:?}");
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {expected:?}"));
    seen
}

fn status(text: &str) -> ViewEvent {
    ViewEvent::Status(text.to_string())
}

/// Spawn a client and wait until it has joined the default room.
async fn joined(
    addr: SocketAddr,
    username: &str,
) -> (ChatClient, mpsc::UnboundedReceiver<ViewEvent>, Vec<ViewEvent>) {
    let (client, mut rx) = net::spawn_net(&config(addr, username));
    let seen = wait_for(&mut rx, &status(&format!("{username} has joined the room."))).await;
    (client, rx, seen)
}

#[tokio::test]
async fn first_user_sees_connect_presence_and_own_join() {
    let addr = start_server().await;
    let (client, _rx, seen) = joined(addr, "alice").await;

    assert_eq!(
        seen,
        [
            ViewEvent::MembersCleared,
            status(STATUS_CONNECTED),
            ViewEvent::MemberAdded("alice".into()),
            status("alice has joined the room."),
        ]
    );
    client.dispose().await;
}

#[tokio::test]
async fn second_user_gets_roster_in_join_order() {
    let addr = start_server().await;
    let (alice, mut alice_rx, _) = joined(addr, "alice").await;
    let (bob, _bob_rx, bob_seen) = joined(addr, "bob").await;

    let added: Vec<&ViewEvent> = bob_seen
        .iter()
        .filter(|e| matches!(e, ViewEvent::MemberAdded(_)))
        .collect();
    assert_eq!(
        added,
        [
            &ViewEvent::MemberAdded("alice".into()),
            &ViewEvent::MemberAdded("bob".into()),
        ]
    );

    let alice_seen = wait_for(&mut alice_rx, &status("bob has joined the room.")).await;
    assert_eq!(
        alice_seen,
        [ViewEvent::MemberAdded("bob".into()), status("bob has joined the room.")]
    );

    alice.dispose().await;
    bob.dispose().await;
}

#[tokio::test]
async fn messages_are_broadcast_to_the_room_including_sender() {
    let addr = start_server().await;
    let (alice, mut alice_rx, _) = joined(addr, "alice").await;
    let (bob, mut bob_rx, _) = joined(addr, "bob").await;
    wait_for(&mut alice_rx, &status("bob has joined the room.")).await;

    assert!(bob.send_message("<b>hello</b>").await);

    let expected = ViewEvent::Message {
        username: "bob".into(),
        text: "<b>hello</b>".into(),
    };
    wait_for(&mut alice_rx, &expected).await;
    wait_for(&mut bob_rx, &expected).await;

    alice.dispose().await;
    bob.dispose().await;
}

#[tokio::test]
async fn changing_room_leaves_the_old_one() {
    let addr = start_server().await;
    let (alice, mut alice_rx, _) = joined(addr, "alice").await;
    let (bob, mut bob_rx, _) = joined(addr, "bob").await;
    wait_for(&mut alice_rx, &status("bob has joined the room.")).await;

    assert!(bob.change_room(RoomName::new("random").unwrap()).await);

    let alice_seen = wait_for(&mut alice_rx, &status("bob has left the room.")).await;
    assert_eq!(
        alice_seen,
        [ViewEvent::MemberRemoved("bob".into()), status("bob has left the room.")]
    );

    // Bob's roster is rebuilt from the new room only.
    let bob_seen = wait_for(&mut bob_rx, &status("bob has joined the room.")).await;
    assert_eq!(
        bob_seen,
        [
            ViewEvent::MembersCleared,
            ViewEvent::MemberAdded("bob".into()),
            status("bob has joined the room."),
        ]
    );

    // Messages in the new room do not reach the old one.
    assert!(bob.send_message("anyone here?").await);
    wait_for(
        &mut bob_rx,
        &ViewEvent::Message {
            username: "bob".into(),
            text: "anyone here?".into(),
        },
    )
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(alice_rx.try_recv().is_err());

    alice.dispose().await;
    bob.dispose().await;
}

#[tokio::test]
async fn disconnecting_user_is_announced_as_leaving() {
    let addr = start_server().await;
    let (alice, mut alice_rx, _) = joined(addr, "alice").await;
    let (bob, _bob_rx, _) = joined(addr, "bob").await;
    wait_for(&mut alice_rx, &status("bob has joined the room.")).await;

    bob.dispose().await;

    wait_for(&mut alice_rx, &status("bob has left the room.")).await;
    alice.dispose().await;
}

#[tokio::test]
async fn dispose_reports_disconnect() {
    let addr = start_server().await;
    let (client, mut rx, _) = joined(addr, "alice").await;

    client.dispose().await;

    let rest: Vec<ViewEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(rest.last(), Some(&status("You have been disconnected.")));
}
