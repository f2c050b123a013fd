//! Session and message data model
//!
//! A [`Session`] is a server-identified conversation with an append-only
//! message log. Message order is insertion order; nothing here sorts or
//! reorders messages.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque session identifier assigned by the remote store
///
/// # Examples
///
/// ```
/// use parley::session::SessionId;
///
/// let id = SessionId::new("65f0c1");
/// assert_eq!(id.as_str(), "65f0c1");
/// assert_eq!(id.to_string(), "65f0c1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a server-issued identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a message
///
/// The service labels assistant replies `"bot"`; that spelling is accepted
/// on input and normalized to [`Sender::Assistant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human typing into the client
    User,
    /// The assistant service
    #[serde(alias = "bot")]
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single immutable entry in a session's message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message
    pub sender: Sender,
    /// Message body, treated as opaque text
    pub text: String,
    /// When the message was created
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message stamped with the current time
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::session::{Message, Sender};
    ///
    /// let message = Message::user("hi");
    /// assert_eq!(message.sender, Sender::User);
    /// assert_eq!(message.text, "hi");
    /// ```
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message stamped with the current time
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A conversation: identity, display title and ordered message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Server-assigned identity, immutable once issued
    pub id: SessionId,
    /// Display title; may be blank
    pub title: String,
    /// Append-ordered message log
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Session {
    /// Create a session handle with an empty log
    pub fn empty(id: SessionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
        }
    }

    /// Title to show the user, falling back when the stored title is blank
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::session::{Session, SessionId};
    ///
    /// let session = Session::empty(SessionId::new("a"), "  ");
    /// assert_eq!(session.display_title("Chat"), "Chat");
    /// ```
    pub fn display_title<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.title.trim().is_empty() {
            fallback
        } else {
            &self.title
        }
    }

    /// Text of the most recent message, if any
    pub fn preview(&self) -> Option<&str> {
        self.messages.last().map(|m| m.text.as_str())
    }
}

/// Accept RFC 3339 timestamps as well as offset-less ISO-8601 ones
///
/// The service stamps assistant replies with local naive times; those are
/// read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Parse a wire timestamp
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
