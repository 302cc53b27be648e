//! Chat session controller.
//!
//! [`ChatSessionController`] is the only component that knows what each
//! server event *means*. It owns the current [`ConnectionSession`], the
//! [`PresenceStore`] of the current room, and the current room name, and it
//! survives any number of reconnects: the session is replaced, everything
//! else carries over.
//!
//! The controller is a synchronous state machine. It never spawns, sleeps,
//! or awaits; the driver in [`crate::net`] feeds it session events, timer
//! ticks, and user commands one at a time.

use chatline_proto::event::{ClientEvent, ServerEvent};
use chatline_proto::room::RoomName;

use crate::presence::PresenceStore;
use crate::session::{ConnectionSession, ConnectionState, SessionEvent};
use crate::transport::Transport;
use crate::view::ChatView;

/// Status line shown when a connection opens.
pub const STATUS_CONNECTED: &str = "You are connected.";
/// Status line shown when a connection closes.
pub const STATUS_DISCONNECTED: &str = "You have been disconnected.";
/// Status line shown when a reconnect attempt starts.
pub const STATUS_RECONNECTING: &str = "Reconnecting...";

/// Orchestrates one user's chat session across reconnects.
#[derive(Debug)]
pub struct ChatSessionController<T: Transport, V: ChatView> {
    transport: T,
    view: V,
    session: ConnectionSession,
    presence: PresenceStore,
    current_room: Option<RoomName>,
    default_room: RoomName,
    /// Number of sessions created so far, used as the next session id.
    sessions_created: u64,
    disposed: bool,
}

impl<T: Transport, V: ChatView> ChatSessionController<T, V> {
    /// Create a controller and immediately start connecting.
    ///
    /// `default_room` is joined every time a connection opens.
    pub fn new(transport: T, view: V, default_room: RoomName) -> Self {
        let session = ConnectionSession::open(&transport, 1);
        Self {
            transport,
            view,
            session,
            presence: PresenceStore::new(),
            current_room: None,
            default_room,
            sessions_created: 1,
            disposed: false,
        }
    }

    /// Return the room this session is in, once one has been joined.
    #[must_use]
    pub const fn current_room(&self) -> Option<&RoomName> {
        self.current_room.as_ref()
    }

    /// Return the members of the current room in first-seen order.
    #[must_use]
    pub fn members(&self) -> &[String] {
        self.presence.members()
    }

    /// Return the state of the current connection.
    #[must_use]
    pub const fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Return the current session.
    #[must_use]
    pub const fn session(&self) -> &ConnectionSession {
        &self.session
    }

    /// Return the current session mutably, for the driver to await events.
    pub const fn session_mut(&mut self) -> &mut ConnectionSession {
        &mut self.session
    }

    /// Number of sessions created, including the current one.
    #[must_use]
    pub const fn sessions_created(&self) -> u64 {
        self.sessions_created
    }

    /// Return the view collaborator.
    #[must_use]
    pub const fn view(&self) -> &V {
        &self.view
    }

    /// Return the view collaborator mutably.
    pub const fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Whether [`Self::dispose`] has been called.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Switch to `room`.
    ///
    /// Clears the roster before asking the server to move us, so events
    /// still in flight for the old room cannot resurrect old members.
    /// Re-joining the current room is allowed and resends the join.
    pub fn change_room(&mut self, room: RoomName) {
        tracing::info!(room = %room, "changing room");
        self.presence.clear();
        self.view.clear_members();
        let join = ClientEvent::Join {
            room_name: room.clone(),
        };
        self.current_room = Some(room);
        self.session.send(&join);
    }

    /// Post `text` to the current room.
    ///
    /// There is no local echo: the message shows up when the server
    /// broadcasts it back. Returns whether the frame was sent; it is
    /// dropped when there is no current room or the connection is not open.
    pub fn send_message(&mut self, text: impl Into<String>) -> bool {
        let Some(room) = self.current_room.clone() else {
            tracing::debug!("dropping message, no room joined yet");
            return false;
        };
        self.session.send(&ClientEvent::Message {
            room_name: room,
            message: text.into(),
        })
    }

    /// Heartbeat timer tick: ping the server if the connection is open.
    ///
    /// Returns whether a ping was sent. Ticks while not open are no-ops.
    pub fn heartbeat_tick(&mut self) -> bool {
        if self.disposed || self.session.state() != ConnectionState::Open {
            return false;
        }
        let Some(room) = self.current_room.clone() else {
            return false;
        };
        self.session.send(&ClientEvent::Ping { room_name: room })
    }

    /// Reconnect-poll timer tick: replace the session if it is closed.
    ///
    /// Only a fully closed session triggers a reconnect; one that is still
    /// connecting is left alone. Returns whether a new session was started.
    pub fn reconnect_tick(&mut self) -> bool {
        if self.disposed || !self.session.is_closed() {
            return false;
        }
        self.sessions_created += 1;
        tracing::info!(session = self.sessions_created, "reconnecting");
        self.view.add_status_message(STATUS_RECONNECTING);
        self.session = ConnectionSession::open(&self.transport, self.sessions_created);
        true
    }

    /// React to an event surfaced by the current session.
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened => {
                self.change_room(self.default_room.clone());
                self.view.add_status_message(STATUS_CONNECTED);
            }
            SessionEvent::Closed => {
                // The roster is kept; the presence snapshot after the next
                // join replaces it.
                self.view.add_status_message(STATUS_DISCONNECTED);
            }
            SessionEvent::Event(server_event) => self.dispatch(server_event),
        }
    }

    /// Apply every signal already queued on the current session.
    ///
    /// Returns the number of session events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while self.session.has_pending() {
            if let Some(event) = self.session.poll_ready() {
                self.handle_session_event(event);
                handled += 1;
            }
        }
        handled
    }

    /// Close the connection and stop reacting to timer ticks.
    ///
    /// The driver cancels the timers themselves; after this call a
    /// reconnect tick never starts a new session.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        tracing::info!("disposing chat session");
        self.disposed = true;
        self.session.close();
    }

    fn dispatch(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Join { username } => {
                if self.presence.add_member(&username) {
                    self.view.add_member(&username);
                }
                self.view
                    .add_status_message(&format!("{username} has joined the room."));
            }
            ServerEvent::Leave { username } => {
                if self.presence.remove_member(&username) {
                    self.view.remove_member(&username);
                }
                self.view
                    .add_status_message(&format!("{username} has left the room."));
            }
            ServerEvent::Presence { usernames } => {
                // Additive: a snapshot never removes members already known.
                for username in &usernames {
                    if self.presence.add_member(username) {
                        self.view.add_member(username);
                    }
                }
            }
            ServerEvent::Pong => {
                tracing::trace!("pong");
            }
            ServerEvent::Broadcast { username, message } => {
                self.view.add_message(&username, &message);
            }
        }
    }
}
