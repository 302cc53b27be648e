//! `Chatline`: real-time chat room client library.
//!
//! The [`controller::ChatSessionController`] owns the session state and
//! survives reconnects; [`net::ChatClient`] drives it on a tokio task.

pub mod app;
pub mod config;
pub mod controller;
pub mod net;
pub mod presence;
pub mod session;
pub mod timers;
pub mod transport;
pub mod view;
