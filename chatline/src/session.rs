//! One transport connection and its lifecycle.
//!
//! A [`ConnectionSession`] is created per connection attempt and thrown away
//! when the connection ends; reconnecting means building a new session.
//! Nothing but the session itself mutates its [`ConnectionState`].
//!
//! ```text
//! Connecting ──open──▶ Open ──close/error──▶ Closed
//!     │                 │                      ▲
//!     └──── close() ────┴──▶ Closing ──────────┘
//! ```

use std::fmt;

use chatline_proto::codec;
use chatline_proto::event::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;

use crate::transport::{
    Outbound, Transport, TransportError, TransportLink, TransportSignal, TransportTask,
};

/// Lifecycle state of a [`ConnectionSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// The transport is opening.
    Connecting,
    /// Frames may be written.
    Open,
    /// A local close was requested and is in flight.
    Closing,
    /// The connection is gone; the session will never reopen.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// What a transport signal meant to the session's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session moved to [`ConnectionState::Open`].
    Opened,
    /// The session moved to [`ConnectionState::Closed`].
    Closed,
    /// A server event was decoded from an inbound frame.
    Event(ServerEvent),
}

/// Owns exactly one transport connection.
pub struct ConnectionSession {
    /// Sequence number assigned by the owner, used in logs.
    id: u64,
    state: ConnectionState,
    signals: mpsc::UnboundedReceiver<TransportSignal>,
    outbound: mpsc::UnboundedSender<Outbound>,
    frames_sent: u64,
    /// Aborted on drop so a discarded session releases its connection.
    _task: TransportTask,
}

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("frames_sent", &self.frames_sent)
            .finish_non_exhaustive()
    }
}

impl ConnectionSession {
    /// Start a new connection through `transport`.
    ///
    /// The session begins in [`ConnectionState::Connecting`]; the transport
    /// opens asynchronously and reports back through signals.
    pub fn open<T: Transport + ?Sized>(transport: &T, id: u64) -> Self {
        let (link, signals, outbound) = TransportLink::channel();
        let task = transport.open(link);
        tracing::debug!(session = id, "session connecting");
        Self {
            id,
            state: ConnectionState::Connecting,
            signals,
            outbound,
            frames_sent: 0,
            _task: task,
        }
    }

    /// Return the owner-assigned session number.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Return the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the session has reached [`ConnectionState::Closed`].
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Number of frames handed to the transport.
    #[must_use]
    pub const fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Encode `event` and write it if the session is open.
    ///
    /// Anything sent while the session is not [`ConnectionState::Open`] is
    /// dropped: there is no queue and no error. Returns whether the frame
    /// was handed to the transport.
    pub fn send(&mut self, event: &ClientEvent) -> bool {
        if self.state != ConnectionState::Open {
            tracing::debug!(
                session = self.id,
                state = %self.state,
                kind = event.kind(),
                "dropping send on non-open session"
            );
            return false;
        }

        let frame = match codec::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(session = self.id, err = %e, "failed to encode event");
                return false;
            }
        };

        if self.outbound.send(Outbound::Frame(frame)).is_err() {
            // The transport task is gone; its close signal is still queued.
            tracing::debug!(session = self.id, "transport gone, dropping send");
            return false;
        }
        self.frames_sent += 1;
        tracing::trace!(session = self.id, kind = event.kind(), "frame sent");
        true
    }

    /// Request a locally initiated close.
    ///
    /// The session enters [`ConnectionState::Closing`] until the transport
    /// confirms with a close signal. If the transport is already gone the
    /// session is closed immediately.
    pub fn close(&mut self) {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                if self.outbound.send(Outbound::Close).is_ok() {
                    self.state = ConnectionState::Closing;
                } else {
                    self.state = ConnectionState::Closed;
                }
                tracing::debug!(session = self.id, state = %self.state, "session close requested");
            }
            ConnectionState::Closing | ConnectionState::Closed => {}
        }
    }

    /// Apply one transport signal to the state machine.
    ///
    /// Returns the event the owner should react to, if any. Undecodable
    /// frames are logged and swallowed; a second close after `Closed` is
    /// ignored.
    pub fn apply(&mut self, signal: TransportSignal) -> Option<SessionEvent> {
        match signal {
            TransportSignal::Open => {
                if self.state != ConnectionState::Connecting {
                    tracing::debug!(session = self.id, state = %self.state, "ignoring late open");
                    return None;
                }
                self.state = ConnectionState::Open;
                tracing::info!(session = self.id, "session open");
                Some(SessionEvent::Opened)
            }
            TransportSignal::Close => self.mark_closed(None),
            TransportSignal::Error(e) => self.mark_closed(Some(&e)),
            TransportSignal::Frame(frame) => {
                if self.state == ConnectionState::Closed {
                    return None;
                }
                match codec::decode_server(&frame) {
                    Ok(event) => Some(SessionEvent::Event(event)),
                    Err(e) if e.is_unknown_kind() => {
                        tracing::warn!(
                            session = self.id,
                            err = %e,
                            "dropping event of unknown kind"
                        );
                        None
                    }
                    Err(e) => {
                        tracing::warn!(session = self.id, err = %e, "dropping undecodable frame");
                        None
                    }
                }
            }
        }
    }

    /// Apply the next signal if one is already queued.
    ///
    /// Returns `None` when no signal is pending or the pending signal
    /// produced no event; callers drain with [`Self::has_pending`].
    pub fn poll_ready(&mut self) -> Option<SessionEvent> {
        match self.signals.try_recv() {
            Ok(signal) => self.apply(signal),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => self.mark_closed(None),
        }
    }

    /// Whether signals are queued and not yet applied.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.signals.is_empty()
    }

    /// Wait for the next signal that produces an event.
    ///
    /// If the transport disappears without a close signal the session is
    /// closed. Once closed and drained, this never resolves. Cancel safe.
    pub async fn next_event(&mut self) -> SessionEvent {
        loop {
            match self.signals.recv().await {
                Some(signal) => {
                    if let Some(event) = self.apply(signal) {
                        return event;
                    }
                }
                None => {
                    if let Some(event) = self.mark_closed(None) {
                        return event;
                    }
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    fn mark_closed(&mut self, error: Option<&TransportError>) -> Option<SessionEvent> {
        if self.state == ConnectionState::Closed {
            return None;
        }
        match error {
            Some(e) => tracing::warn!(session = self.id, err = %e, "session failed"),
            None => tracing::info!(session = self.id, "session closed"),
        }
        self.state = ConnectionState::Closed;
        Some(SessionEvent::Closed)
    }
}
