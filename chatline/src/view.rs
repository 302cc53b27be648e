//! Presentation collaborators of the session controller.
//!
//! The controller never renders anything itself; it reports what happened
//! through a [`ChatView`] supplied at construction. Implementations decide
//! how to display it and must treat every string as untrusted.

use tokio::sync::mpsc;

/// Receives everything the controller wants shown to the user.
pub trait ChatView {
    /// A chat message from `username` arrived in the current room.
    fn add_message(&mut self, username: &str, text: &str);

    /// A status line (connection changes, joins, leaves).
    fn add_status_message(&mut self, text: &str);

    /// `name` was added to the member list.
    fn add_member(&mut self, name: &str);

    /// `name` was removed from the member list.
    fn remove_member(&mut self, name: &str);

    /// The member list was emptied, e.g. after a room change.
    fn clear_members(&mut self);
}

/// A single view update, as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// See [`ChatView::add_message`].
    Message {
        /// Author of the message.
        username: String,
        /// Message text.
        text: String,
    },
    /// See [`ChatView::add_status_message`].
    Status(String),
    /// See [`ChatView::add_member`].
    MemberAdded(String),
    /// See [`ChatView::remove_member`].
    MemberRemoved(String),
    /// See [`ChatView::clear_members`].
    MembersCleared,
}

/// Records every update in order. Useful in tests and for replay.
impl ChatView for Vec<ViewEvent> {
    fn add_message(&mut self, username: &str, text: &str) {
        self.push(ViewEvent::Message {
            username: username.to_string(),
            text: text.to_string(),
        });
    }

    fn add_status_message(&mut self, text: &str) {
        self.push(ViewEvent::Status(text.to_string()));
    }

    fn add_member(&mut self, name: &str) {
        self.push(ViewEvent::MemberAdded(name.to_string()));
    }

    fn remove_member(&mut self, name: &str) {
        self.push(ViewEvent::MemberRemoved(name.to_string()));
    }

    fn clear_members(&mut self) {
        self.push(ViewEvent::MembersCleared);
    }
}

/// Forwards view updates over a channel to another task.
///
/// Updates are dropped silently once the receiving side is gone.
#[derive(Debug, Clone)]
pub struct ChannelView {
    tx: mpsc::UnboundedSender<ViewEvent>,
}

impl ChannelView {
    /// Create a view and the receiver its updates arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ViewEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: ViewEvent) {
        let _ = self.tx.send(event);
    }
}

impl ChatView for ChannelView {
    fn add_message(&mut self, username: &str, text: &str) {
        self.emit(ViewEvent::Message {
            username: username.to_string(),
            text: text.to_string(),
        });
    }

    fn add_status_message(&mut self, text: &str) {
        self.emit(ViewEvent::Status(text.to_string()));
    }

    fn add_member(&mut self, name: &str) {
        self.emit(ViewEvent::MemberAdded(name.to_string()));
    }

    fn remove_member(&mut self, name: &str) {
        self.emit(ViewEvent::MemberRemoved(name.to_string()));
    }

    fn clear_members(&mut self) {
        self.emit(ViewEvent::MembersCleared);
    }
}
