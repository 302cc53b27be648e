//! Loopback transport for testing.
//!
//! [`LoopbackTransport`] never touches the network. Every call to
//! [`Transport::open`] records a [`LoopbackConnection`] that the test
//! drives by hand: it decides when the connection opens, which frames
//! arrive, and when it closes, and it can inspect everything the session
//! wrote.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Outbound, Transport, TransportError, TransportLink, TransportSignal, TransportTask};

/// In-process transport whose connections are scripted by the caller.
///
/// Clones share the same connection log, so a test keeps one clone and
/// hands another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct LoopbackTransport {
    connections: Arc<Mutex<Vec<LoopbackConnection>>>,
    auto_open: bool,
}

impl LoopbackTransport {
    /// Create a transport whose connections stay `Connecting` until the
    /// test calls [`LoopbackConnection::open`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose connections report `Open` immediately.
    #[must_use]
    pub fn auto_open() -> Self {
        Self {
            connections: Arc::default(),
            auto_open: true,
        }
    }

    /// Number of connections opened so far.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// The connection opened `index`-th (zero-based).
    #[must_use]
    pub fn connection(&self, index: usize) -> Option<LoopbackConnection> {
        self.connections.lock().get(index).cloned()
    }

    /// The most recently opened connection.
    #[must_use]
    pub fn latest(&self) -> Option<LoopbackConnection> {
        self.connections.lock().last().cloned()
    }
}

impl Transport for LoopbackTransport {
    fn open(&self, link: TransportLink) -> TransportTask {
        let TransportLink { signals, outbound } = link;
        let connection = LoopbackConnection {
            signals,
            outbound: Arc::new(Mutex::new(outbound)),
        };
        if self.auto_open {
            connection.open();
        }
        self.connections.lock().push(connection);
        TransportTask::detached()
    }
}

/// The far end of one loopback connection.
#[derive(Debug, Clone)]
pub struct LoopbackConnection {
    signals: mpsc::UnboundedSender<TransportSignal>,
    outbound: Arc<Mutex<mpsc::UnboundedReceiver<Outbound>>>,
}

impl LoopbackConnection {
    /// Report the connection as established.
    pub fn open(&self) {
        let _ = self.signals.send(TransportSignal::Open);
    }

    /// Deliver an inbound text frame.
    pub fn push_frame(&self, frame: impl Into<String>) {
        let _ = self.signals.send(TransportSignal::Frame(frame.into()));
    }

    /// Report a normal close.
    pub fn close(&self) {
        let _ = self.signals.send(TransportSignal::Close);
    }

    /// Report a connection failure.
    pub fn fail(&self, error: TransportError) {
        let _ = self.signals.send(TransportSignal::Error(error));
    }

    /// Whether the owning session has been dropped.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.signals.is_closed()
    }

    /// Drain everything the session has written so far.
    #[must_use]
    pub fn drain_outbound(&self) -> Vec<Outbound> {
        let mut rx = self.outbound.lock();
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    /// Drain written text frames, discarding close requests.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<String> {
        self.drain_outbound()
            .into_iter()
            .filter_map(|out| match out {
                Outbound::Frame(text) => Some(text),
                Outbound::Close => None,
            })
            .collect()
    }
}
