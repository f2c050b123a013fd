//! Remote service abstraction
//!
//! This module defines the [`ChatApi`] trait, one method per call the
//! assistant service exposes. Implementations live in submodules:
//!
//! - [`http::HttpChatApi`] -- reqwest client whose cookie store carries the
//!   service's session cookie as the ambient credential.
//! - `fake::FakeChatApi` -- in-process fake used by unit tests (cfg(test)
//!   only).
//!
//! # Design
//!
//! Credentials are never threaded through the calls: whatever the transport
//! received from `login` is attached to every later request automatically.
//! Components hold an `Arc<dyn ChatApi>` and never see the credential.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::{Message, Session, SessionId};

pub mod http;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use types::{Credentials, Profile};

/// Request/response contract with the assistant service.
///
/// Every method performs exactly one remote exchange. No method retries.
#[async_trait]
pub trait ChatApi: Send + Sync + std::fmt::Debug {
    /// Probe whether the ambient credential is accepted.
    ///
    /// # Returns
    ///
    /// `Ok(true)` on a success status, `Ok(false)` on any other status.
    ///
    /// # Errors
    ///
    /// Returns an error only when the probe could not be completed at all.
    async fn check_auth(&self) -> Result<bool>;

    /// Register a new account. Does not authenticate the client.
    async fn signup(&self, profile: &Profile) -> Result<()>;

    /// Authenticate and establish the ambient credential.
    async fn login(&self, credentials: &Credentials) -> Result<()>;

    /// Invalidate the ambient credential.
    async fn logout(&self) -> Result<()>;

    /// Fetch every session visible to the authenticated user, in server order.
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// Create an empty session and return its server-issued id.
    async fn create_session(&self, title: &str) -> Result<SessionId>;

    /// Append `message` to the session and return the assistant reply, if any.
    async fn append_message(&self, id: &SessionId, message: &Message) -> Result<Option<Message>>;

    /// Mark the session closed on the remote store.
    async fn close_session(&self, id: &SessionId, title: Option<&str>) -> Result<()>;
}
