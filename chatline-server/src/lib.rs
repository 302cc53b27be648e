//! `Chatline` room server library.
//!
//! Exposes the server for use in tests and embedding. Connections join
//! named rooms and exchange JSON chat events over WebSocket.

pub mod config;
pub mod rooms;
pub mod server;
