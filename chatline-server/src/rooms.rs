//! Room membership for the chat server.
//!
//! Tracks every live connection, the room it is in, and the members of each
//! room in join order. Every outgoing event is encoded once and pushed onto
//! the per-connection channels; the socket writer tasks do the actual I/O.
//!
//! Rooms are ephemeral: created on first join, dropped when the last member
//! leaves, and lost on restart.

use std::collections::HashMap;

use chatline_proto::codec;
use chatline_proto::event::ServerEvent;
use chatline_proto::room::RoomName;
use tokio::sync::{RwLock, mpsc};

/// Identifies one WebSocket connection.
pub type ConnectionId = u64;

struct Connection {
    username: String,
    room: Option<RoomName>,
    tx: mpsc::UnboundedSender<String>,
}

#[derive(Default)]
struct Registry {
    next_id: ConnectionId,
    connections: HashMap<ConnectionId, Connection>,
    /// Members of each room, in join order.
    rooms: HashMap<RoomName, Vec<ConnectionId>>,
}

impl Registry {
    /// Encode `event` and queue it for each of `targets`.
    fn send(&self, targets: &[ConnectionId], event: &ServerEvent) {
        let frame = match codec::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(err = %e, kind = event.kind(), "failed to encode event");
                return;
            }
        };
        for id in targets {
            if let Some(conn) = self.connections.get(id) {
                let _ = conn.tx.send(frame.clone());
            }
        }
    }

    fn members_of(&self, room: &RoomName) -> Vec<ConnectionId> {
        self.rooms.get(room).cloned().unwrap_or_default()
    }

    fn usernames_in(&self, room: &RoomName) -> Vec<String> {
        self.members_of(room)
            .iter()
            .filter_map(|id| self.connections.get(id))
            .map(|c| c.username.clone())
            .collect()
    }

    /// Take `id` out of its current room and tell the remaining members.
    fn leave_current(&mut self, id: ConnectionId) {
        let Some(conn) = self.connections.get_mut(&id) else {
            return;
        };
        let Some(room) = conn.room.take() else {
            return;
        };
        let username = conn.username.clone();

        if let Some(members) = self.rooms.get_mut(&room) {
            members.retain(|m| *m != id);
            if members.is_empty() {
                self.rooms.remove(&room);
                tracing::debug!(room = %room, "room emptied");
            }
        }
        tracing::info!(room = %room, username = %username, "left room");
        let remaining = self.members_of(&room);
        self.send(&remaining, &ServerEvent::Leave { username });
    }
}

/// In-memory directory of connections and rooms.
///
/// Thread-safe via [`RwLock`]; every mutation is applied atomically so
/// members see join and leave events in a consistent order.
#[derive(Default)]
pub struct RoomRegistry {
    inner: RwLock<Registry>,
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection for `username`. Frames for it arrive on `tx`.
    pub async fn connect(&self, username: &str, tx: mpsc::UnboundedSender<String>) -> ConnectionId {
        let mut reg = self.inner.write().await;
        reg.next_id += 1;
        let id = reg.next_id;
        reg.connections.insert(
            id,
            Connection {
                username: username.to_string(),
                room: None,
                tx,
            },
        );
        tracing::debug!(conn = id, username = %username, "connection registered");
        id
    }

    /// Moves connection `id` into `room`.
    ///
    /// Leaving the previous room is broadcast there. The joiner then gets a
    /// presence snapshot (which includes itself), and every member of the
    /// new room, the joiner included, gets a join event. Joining the room
    /// the connection is already in repeats the snapshot and the join.
    pub async fn join(&self, id: ConnectionId, room: RoomName) {
        let mut reg = self.inner.write().await;
        let Some(current) = reg.connections.get(&id).map(|c| c.room.clone()) else {
            return;
        };

        if current.as_ref() != Some(&room) {
            reg.leave_current(id);
            reg.rooms.entry(room.clone()).or_default().push(id);
            if let Some(conn) = reg.connections.get_mut(&id) {
                conn.room = Some(room.clone());
            }
        }

        let Some(username) = reg.connections.get(&id).map(|c| c.username.clone()) else {
            return;
        };
        tracing::info!(conn = id, room = %room, username = %username, "joined room");

        let usernames = reg.usernames_in(&room);
        reg.send(&[id], &ServerEvent::Presence { usernames });
        let members = reg.members_of(&room);
        reg.send(&members, &ServerEvent::Join { username });
    }

    /// Broadcasts `message` from connection `id` to `room`.
    ///
    /// Returns `false` (and sends nothing) if the connection is not in
    /// `room`.
    pub async fn broadcast(&self, id: ConnectionId, room: &RoomName, message: String) -> bool {
        let reg = self.inner.read().await;
        let Some(conn) = reg.connections.get(&id) else {
            return false;
        };
        if conn.room.as_ref() != Some(room) {
            tracing::warn!(conn = id, room = %room, "message for a room the sender is not in");
            return false;
        }
        let event = ServerEvent::Broadcast {
            username: conn.username.clone(),
            message,
        };
        reg.send(&reg.members_of(room), &event);
        true
    }

    /// Sends `event` to connection `id` only.
    pub async fn send_to(&self, id: ConnectionId, event: &ServerEvent) {
        self.inner.read().await.send(&[id], event);
    }

    /// Removes connection `id`, broadcasting its departure from its room.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut reg = self.inner.write().await;
        reg.leave_current(id);
        if reg.connections.remove(&id).is_some() {
            tracing::debug!(conn = id, "connection unregistered");
        }
    }

    /// Drops every connection without leave broadcasts.
    ///
    /// Each connection's frame channel closes, which makes its writer send
    /// a close frame. Returns the number of connections dropped.
    pub async fn disconnect_all(&self) -> usize {
        let mut reg = self.inner.write().await;
        let count = reg.connections.len();
        reg.connections.clear();
        reg.rooms.clear();
        tracing::info!(count, "dropped all connections");
        count
    }

    /// Usernames in `room`, in join order.
    pub async fn members(&self, room: &RoomName) -> Vec<String> {
        self.inner.read().await.usernames_in(room)
    }

    /// Room connection `id` is currently in.
    pub async fn room_of(&self, id: ConnectionId) -> Option<RoomName> {
        self.inner
            .read()
            .await
            .connections
            .get(&id)
            .and_then(|c| c.room.clone())
    }

    /// Number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.len()
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }
}
