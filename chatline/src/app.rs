//! Line-oriented terminal front end.
//!
//! [`parse_input`] turns one line typed by the user into an [`InputAction`];
//! [`App`] turns view updates from the session into transcript lines. Both
//! are pure so the binary's I/O loop stays trivial.

use std::fmt::Write as _;

use chatline_proto::room::{RoomName, RoomNameError};
use chrono::{DateTime, TimeZone};

use crate::view::ViewEvent;

/// Format used when the configured one cannot be rendered.
const FALLBACK_TIMESTAMP_FORMAT: &str = "%H:%M";

/// What the user asked for with one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Post the text to the current room.
    Send(String),
    /// `/join <room>`.
    Join(RoomName),
    /// `/members`: print the roster.
    Members,
    /// `/quit`.
    Quit,
    /// Blank input; nothing to do.
    Ignore,
    /// A command that could not be understood, with a message for the user.
    Invalid(String),
}

/// Parse one input line.
///
/// Lines that are empty or only whitespace are ignored. Non-command text is
/// sent exactly as typed.
#[must_use]
pub fn parse_input(line: &str) -> InputAction {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return InputAction::Ignore;
    }

    let Some(command) = line.trim_start().strip_prefix('/') else {
        return InputAction::Send(line.to_string());
    };
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .unwrap_or((command, ""));

    match name {
        "join" => match RoomName::new(arg) {
            Ok(room) => InputAction::Join(room),
            Err(RoomNameError::Empty) => InputAction::Invalid("usage: /join <room>".to_string()),
            Err(e) => InputAction::Invalid(e.to_string()),
        },
        "members" => InputAction::Members,
        "quit" | "exit" => InputAction::Quit,
        other => InputAction::Invalid(format!("unknown command /{other}")),
    }
}

/// Replace control characters with their escaped form.
///
/// Everything shown in the terminal comes from other users, so nothing is
/// allowed to move the cursor or change colors.
#[must_use]
pub fn escape_control(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

/// Terminal front-end state.
#[derive(Debug, Clone)]
pub struct App {
    members: Vec<String>,
    timestamp_format: String,
}

impl App {
    /// Create the front end with a chrono timestamp format.
    #[must_use]
    pub fn new(timestamp_format: impl Into<String>) -> Self {
        Self {
            members: Vec::new(),
            timestamp_format: timestamp_format.into(),
        }
    }

    /// Members of the current room as last reported by the session.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Render the roster for `/members`.
    #[must_use]
    pub fn members_line(&self) -> String {
        if self.members.is_empty() {
            return "no members".to_string();
        }
        let names: Vec<String> = self.members.iter().map(|m| escape_control(m)).collect();
        format!("members: {}", names.join(", "))
    }

    /// Apply a view update, returning the transcript line to print, if any.
    pub fn apply<Tz>(&mut self, event: ViewEvent, now: &DateTime<Tz>) -> Option<String>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        match event {
            ViewEvent::Message { username, text } => Some(format!(
                "[{}] <{}> {}",
                self.timestamp(now),
                escape_control(&username),
                escape_control(&text)
            )),
            ViewEvent::Status(text) => Some(format!(
                "[{}] * {}",
                self.timestamp(now),
                escape_control(&text)
            )),
            ViewEvent::MemberAdded(name) => {
                if !self.members.contains(&name) {
                    self.members.push(name);
                }
                None
            }
            ViewEvent::MemberRemoved(name) => {
                self.members.retain(|m| *m != name);
                None
            }
            ViewEvent::MembersCleared => {
                self.members.clear();
                None
            }
        }
    }

    fn timestamp<Tz>(&self, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.timestamp_format)).is_ok() {
            return out;
        }
        // Invalid format string.
        now.format(FALLBACK_TIMESTAMP_FORMAT).to_string()
    }
}
