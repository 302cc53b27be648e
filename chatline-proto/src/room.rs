//! Room identifiers.
//!
//! A [`RoomName`] is the only room-scoped value carried on the wire. Names
//! are validated once at construction so every `RoomName` in the system is
//! known to be non-empty, bounded, and free of control characters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum room name length in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Room every session joins as soon as its connection opens.
pub const DEFAULT_ROOM: &str = "general";

/// Errors produced when validating a room name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomNameError {
    /// Name is empty or only whitespace.
    #[error("room name cannot be empty")]
    Empty,
    /// Name exceeds [`MAX_NAME_LEN`] characters.
    #[error("room name exceeds {MAX_NAME_LEN} characters")]
    TooLong,
    /// Name contains control characters.
    #[error("room name contains control characters")]
    ControlChars,
}

/// Name of a chat room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName(String);

impl RoomName {
    /// Validate and wrap a room name.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns [`RoomNameError`] if the trimmed name is empty, longer than
    /// [`MAX_NAME_LEN`] characters, or contains control characters.
    pub fn new(name: impl AsRef<str>) -> Result<Self, RoomNameError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(RoomNameError::Empty);
        }
        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(RoomNameError::TooLong);
        }
        if trimmed.chars().any(char::is_control) {
            return Err(RoomNameError::ControlChars);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The default room, [`DEFAULT_ROOM`].
    #[must_use]
    pub fn general() -> Self {
        Self(DEFAULT_ROOM.to_string())
    }

    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomName {
    type Error = RoomNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoomName> for String {
    fn from(room: RoomName) -> Self {
        room.0
    }
}

impl std::str::FromStr for RoomName {
    type Err = RoomNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
