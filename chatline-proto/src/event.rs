//! Typed events exchanged between chat clients and the room server.
//!
//! Every frame is a single JSON object whose `type` field names the event
//! and whose remaining fields are the event's payload. The two directions
//! share the discriminator space (`join` exists in both) but carry
//! different payloads, so each direction has its own enum.

use serde::{Deserialize, Serialize};

use crate::room::RoomName;

/// Events a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientEvent {
    /// Move this connection into `room_name`.
    Join {
        /// Room to join.
        room_name: RoomName,
    },
    /// Post a message to `room_name`.
    Message {
        /// Room the message is addressed to.
        room_name: RoomName,
        /// Message text.
        message: String,
    },
    /// Liveness heartbeat.
    Ping {
        /// Room the client currently believes it is in.
        room_name: RoomName,
    },
}

impl ClientEvent {
    /// Return the wire discriminator of this event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Message { .. } => "message",
            Self::Ping { .. } => "ping",
        }
    }
}

/// Events the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// A user joined the current room.
    Join {
        /// Who joined.
        username: String,
    },
    /// A user left the current room.
    Leave {
        /// Who left.
        username: String,
    },
    /// Snapshot of the room roster, sent right after a join.
    Presence {
        /// Members present in the room, in server order.
        usernames: Vec<String>,
    },
    /// Heartbeat acknowledgment.
    Pong,
    /// A message posted to the current room, including our own.
    Broadcast {
        /// Author of the message.
        username: String,
        /// Message text.
        message: String,
    },
}

impl ServerEvent {
    /// Return the wire discriminator of this event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Presence { .. } => "presence",
            Self::Pong => "pong",
            Self::Broadcast { .. } => "broadcast",
        }
    }
}
