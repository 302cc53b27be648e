//! Transport layer abstraction for `Chatline`.
//!
//! A transport carries JSON text frames over one duplex connection and
//! reports its lifecycle as [`TransportSignal`]s. Implementations:
//! - [`ws::WsTransport`]: WebSocket connection to a chat server
//! - [`loopback::LoopbackTransport`]: in-process, scripted by the caller

pub mod loopback;
pub mod ws;

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors that can occur while a transport connection is open or opening.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection attempt timed out.
    #[error("connection attempt timed out")]
    Timeout,

    /// The server could not be reached.
    #[error("server {0} is unreachable")]
    Unreachable(String),

    /// The WebSocket layer reported a protocol failure.
    #[error("websocket protocol error: {0}")]
    Protocol(String),

    /// An underlying I/O error occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lifecycle and data notifications sent from a transport to its session.
#[derive(Debug)]
pub enum TransportSignal {
    /// The connection is established and frames may be written.
    Open,
    /// A text frame arrived.
    Frame(String),
    /// The connection closed normally.
    Close,
    /// The connection failed.
    Error(TransportError),
}

/// Requests sent from a session to its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write one text frame.
    Frame(String),
    /// Close the connection.
    Close,
}

/// The transport's half of a session's channels.
///
/// Created by the session and handed to [`Transport::open`]. The transport
/// reports progress on `signals` and drains write requests from `outbound`.
#[derive(Debug)]
pub struct TransportLink {
    /// Signals toward the owning session.
    pub signals: mpsc::UnboundedSender<TransportSignal>,
    /// Frames and close requests from the owning session.
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
}

impl TransportLink {
    /// Create a link plus the session-side ends of its channels.
    #[must_use]
    pub fn channel() -> (
        Self,
        mpsc::UnboundedReceiver<TransportSignal>,
        mpsc::UnboundedSender<Outbound>,
    ) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (
            Self {
                signals: signal_tx,
                outbound: outbound_rx,
            },
            signal_rx,
            outbound_tx,
        )
    }

    /// Report a signal to the session.
    ///
    /// Returns `false` if the session has already been dropped.
    pub fn signal(&self, signal: TransportSignal) -> bool {
        self.signals.send(signal).is_ok()
    }
}

/// Background work backing one open connection.
///
/// Dropping the task aborts it, which tears down the connection. A session
/// that is replaced on reconnect therefore never leaks its old socket.
#[derive(Debug, Default)]
pub struct TransportTask(Option<JoinHandle<()>>);

impl TransportTask {
    /// Spawn `future` on the current tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(Some(tokio::spawn(future)))
    }

    /// A task with no background work, for transports driven by the caller.
    #[must_use]
    pub const fn detached() -> Self {
        Self(None)
    }
}

impl Drop for TransportTask {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// A connector that can open any number of independent connections.
///
/// `open` must not block: it starts the connection and returns at once,
/// reporting [`TransportSignal::Open`] (or a failure) through the link later.
pub trait Transport: Send + Sync + 'static {
    /// Start opening a new connection bound to `link`.
    fn open(&self, link: TransportLink) -> TransportTask;
}
