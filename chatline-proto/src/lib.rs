//! Shared protocol definitions for the `Chatline` wire format.

pub mod codec;
pub mod event;
pub mod room;
