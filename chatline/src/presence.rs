//! Member roster of the current room.
//!
//! [`PresenceStore`] is a plain ordered set: no I/O, no locking. It is
//! owned by the session controller and mutated only from its event loop.

/// Ordered, duplicate-free set of usernames present in the current room.
///
/// Insertion order is preserved so that renderers list members in the
/// order they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceStore {
    members: Vec<String>,
}

impl PresenceStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Appends `name` unless it is already present.
    ///
    /// Returns `true` if the roster changed.
    pub fn add_member(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.members.push(name.to_string());
        true
    }

    /// Removes `name` if present.
    ///
    /// Returns `true` if the roster changed.
    pub fn remove_member(&mut self, name: &str) -> bool {
        let Some(idx) = self.members.iter().position(|m| m == name) else {
            return false;
        };
        self.members.remove(idx);
        true
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// Current members in first-seen order.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Whether `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    /// Number of members.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
