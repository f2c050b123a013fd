//! Wire types for the assistant service
//!
//! Request bodies are serialized exactly as the service expects them;
//! response bodies are decoded leniently where the service is known to omit
//! fields.

use serde::{Deserialize, Serialize};

use crate::session::{Message, Session, SessionId};

/// Login request body
///
/// The service validates login bodies against its signup model, which
/// requires a `name`; an absent name is sent as an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Display name; optional for login
    #[serde(default, serialize_with = "serialize_optional_name")]
    pub name: Option<String>,
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Credentials without a display name
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
            password: password.into(),
        }
    }
}

fn serialize_optional_name<S>(name: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(name.as_deref().unwrap_or_default())
}

/// Signup request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Display name
    pub name: String,
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl Profile {
    /// Credentials for the login step that follows a successful signup
    pub fn credentials(&self) -> Credentials {
        Credentials {
            name: Some(self.name.clone()),
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

/// One entry of the session list
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSession {
    /// Session id; entries without one cannot be selected
    #[serde(default, alias = "chat_id", alias = "_id")]
    pub id: Option<SessionId>,
    /// Stored title
    #[serde(default)]
    pub title: Option<String>,
    /// Message history, when the service includes it
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl RemoteSession {
    /// Convert into a session handle, or `None` when the id is missing
    pub fn into_session(self) -> Option<Session> {
        let id = self.id?;
        Some(Session {
            id,
            title: self.title.unwrap_or_default(),
            messages: self.messages,
        })
    }
}

/// Body of `POST /start_chat`
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest<'a> {
    /// Requested title
    pub title: &'a str,
}

/// Response of `POST /start_chat`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionResponse {
    /// Newly issued session id
    pub chat_id: SessionId,
}

/// Body of `POST /save_chat`
#[derive(Debug, Clone, Serialize)]
pub struct AppendRequest<'a> {
    /// Target session
    pub chat_id: &'a SessionId,
    /// Message to append
    pub message: &'a Message,
}

/// Response of `POST /save_chat`
#[derive(Debug, Clone, Deserialize)]
pub struct AppendResponse {
    /// Assistant reply, when the service produced one
    #[serde(default)]
    pub llm_response: Option<Message>,
    /// Error reported with a success status
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /end_chat`
#[derive(Debug, Clone, Serialize)]
pub struct CloseRequest<'a> {
    /// Session to close
    pub chat_id: &'a SessionId,
    /// Title to record for the closed session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

/// Generic `{"error": ...}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Error text, when present
    #[serde(default)]
    pub error: Option<String>,
}
