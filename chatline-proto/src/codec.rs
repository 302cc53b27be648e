//! Serialization and deserialization for the `Chatline` wire protocol.
//!
//! Frames are JSON text: one object per frame, discriminated by a `type`
//! field. Decoding inspects the discriminator before touching the payload
//! so callers can tell a malformed frame apart from a well-formed frame of
//! a kind they do not handle.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::event::{ClientEvent, ServerEvent};

/// Name of the discriminator field carried by every frame.
pub const TYPE_FIELD: &str = "type";

/// Error type for decode operations.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The frame is valid JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,
    /// The frame has no string `type` field.
    #[error("frame has no `type` discriminator")]
    MissingType,
    /// The discriminator does not name a known event.
    #[error("unknown event kind `{kind}`")]
    UnknownEventKind {
        /// The unrecognised discriminator.
        kind: String,
    },
    /// The discriminator is known but the payload fields do not match it.
    #[error("invalid `{kind}` payload: {source}")]
    InvalidPayload {
        /// Discriminator of the rejected frame.
        kind: String,
        /// Underlying field error.
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Whether the frame was well-formed but named an unhandled event kind.
    #[must_use]
    pub const fn is_unknown_kind(&self) -> bool {
        matches!(self, Self::UnknownEventKind { .. })
    }
}

/// Error type for encode operations.
#[derive(Debug, thiserror::Error)]
#[error("serialization error: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// An event type that can travel over the wire.
pub trait WireEvent: Serialize + DeserializeOwned {
    /// Discriminators this event type accepts on decode.
    const KINDS: &'static [&'static str];
}

impl WireEvent for ClientEvent {
    const KINDS: &'static [&'static str] = &["join", "message", "ping"];
}

impl WireEvent for ServerEvent {
    const KINDS: &'static [&'static str] = &["join", "leave", "presence", "pong", "broadcast"];
}

/// Encodes an event into a single JSON text frame.
///
/// # Errors
///
/// Returns [`EncodeError`] if the event cannot be serialized.
pub fn encode<E: WireEvent>(event: &E) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(event)?)
}

/// Decodes one JSON text frame into an event.
///
/// # Errors
///
/// Returns [`DecodeError`] if the frame is not a JSON object, lacks a
/// string `type` field, names an unknown kind, or carries a payload that
/// does not match its kind.
pub fn decode<E: WireEvent>(frame: &str) -> Result<E, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(frame).map_err(DecodeError::Malformed)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let kind = object
        .get(TYPE_FIELD)
        .and_then(serde_json::Value::as_str)
        .ok_or(DecodeError::MissingType)?;

    if !E::KINDS.contains(&kind) {
        return Err(DecodeError::UnknownEventKind {
            kind: kind.to_string(),
        });
    }
    let kind = kind.to_string();

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload { kind, source })
}

/// Decodes a frame pushed by the server.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_server(frame: &str) -> Result<ServerEvent, DecodeError> {
    decode(frame)
}

/// Decodes a frame sent by a client.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_client(frame: &str) -> Result<ClientEvent, DecodeError> {
    decode(frame)
}
