//! Active conversation and its synchronization with the service
//!
//! [`ConversationView`] owns the message log of exactly one active session.
//!
//! # Sending
//!
//! A user message is appended locally before the request goes out and is
//! never rolled back: if the append fails the message stays visible and the
//! failure is reported as [`SendOutcome::Unconfirmed`]. An assistant reply is
//! appended only while the session it answers is still the active one.
//!
//! # Finalizing
//!
//! Finalize only counts once the service confirms the close. Until then the
//! active session and its log are left exactly as they were; afterwards the
//! log is dropped and a fresh session is bootstrapped through the directory.
//!
//! # Detached sends
//!
//! [`ConversationView::send_message_detached`] spawns the round trip holding
//! only a weak reference to the view, so a completion that arrives after the
//! view is dropped is discarded instead of touching freed state.

use std::sync::{Arc, Weak};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::api::ChatApi;
use crate::directory::SessionDirectory;
use crate::error::{ParleyError, Result};
use crate::session::{Message, Sender, Session, SessionId};

/// Lifecycle of the view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// No session adopted yet
    Uninitialized,
    /// Displaying and mutating this session
    Active(Session),
}

/// Result of a send that got past the local append
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank input; nothing was appended or sent
    Ignored,
    /// Service stored the message and produced no reply
    Delivered,
    /// Service stored the message and this reply was appended
    Replied(Message),
    /// Reply arrived after another session became active and was dropped
    Discarded,
    /// Request failed; the optimistic message stays in the log
    Unconfirmed(String),
    /// The view was dropped before the request completed
    ViewGone,
}

/// Owner of the active session's message log
#[derive(Debug)]
pub struct ConversationView {
    inner: Arc<ViewInner>,
}

#[derive(Debug)]
struct ViewInner {
    api: Arc<dyn ChatApi>,
    directory: SessionDirectory,
    state: RwLock<ViewState>,
    new_session_title: String,
}

/// A user message already appended locally and awaiting the service
#[derive(Debug)]
struct PendingSend {
    session_id: SessionId,
    message: Message,
}

impl ConversationView {
    /// Create an uninitialized view
    ///
    /// # Arguments
    ///
    /// * `api` - Service client
    /// * `directory` - Directory through which new sessions are created
    /// * `new_session_title` - Title for sessions bootstrapped by the view
    pub fn new(
        api: Arc<dyn ChatApi>,
        directory: SessionDirectory,
        new_session_title: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                api,
                directory,
                state: RwLock::new(ViewState::Uninitialized),
                new_session_title: new_session_title.into(),
            }),
        }
    }

    /// Snapshot of the view state
    pub async fn state(&self) -> ViewState {
        self.inner.state.read().await.clone()
    }

    /// Snapshot of the active session
    pub async fn active_session(&self) -> Option<Session> {
        match &*self.inner.state.read().await {
            ViewState::Active(session) => Some(session.clone()),
            ViewState::Uninitialized => None,
        }
    }

    /// Id of the active session
    pub async fn active_id(&self) -> Option<SessionId> {
        match &*self.inner.state.read().await {
            ViewState::Active(session) => Some(session.id.clone()),
            ViewState::Uninitialized => None,
        }
    }

    /// Snapshot of the active message log; empty when uninitialized
    pub async fn messages(&self) -> Vec<Message> {
        match &*self.inner.state.read().await {
            ViewState::Active(session) => session.messages.clone(),
            ViewState::Uninitialized => Vec::new(),
        }
    }

    /// Adopt `session`, or create and adopt a fresh one when `None`
    ///
    /// Adoption replaces the previous log entirely. The fresh session is
    /// created through the directory, so it is listed there too.
    ///
    /// # Returns
    ///
    /// Id of the now-active session
    ///
    /// # Errors
    ///
    /// Returns the creation error when `session` is `None` and the service
    /// cannot create one; the view is unchanged in that case.
    pub async fn select_or_init(&self, session: Option<Session>) -> Result<SessionId> {
        let session = match session {
            Some(session) => session,
            None => {
                self.inner
                    .directory
                    .create_session(&self.inner.new_session_title)
                    .await?
            }
        };
        let id = session.id.clone();
        tracing::info!(%id, messages = session.messages.len(), "session activated");
        *self.inner.state.write().await = ViewState::Active(session);
        Ok(id)
    }

    /// Append a user message and round-trip it to the service
    ///
    /// Blank or whitespace-only text is ignored without a remote call.
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::NoActiveSession`] when no session is active.
    /// Service failures are reported through [`SendOutcome::Unconfirmed`].
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome> {
        let Some(pending) = self.begin_send(text).await? else {
            return Ok(SendOutcome::Ignored);
        };
        let result = self
            .inner
            .api
            .append_message(&pending.session_id, &pending.message)
            .await;
        Ok(self.inner.finish_send(pending, result).await)
    }

    /// Like [`ConversationView::send_message`], but the round trip runs detached
    ///
    /// The optimistic append happens before this returns. The spawned task
    /// only reaches the view if it still exists when the service answers.
    ///
    /// # Returns
    ///
    /// `None` for blank input, otherwise the handle of the spawned round trip
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::NoActiveSession`] when no session is active
    pub async fn send_message_detached(
        &self,
        text: &str,
    ) -> Result<Option<JoinHandle<SendOutcome>>> {
        let Some(pending) = self.begin_send(text).await? else {
            return Ok(None);
        };
        let api = Arc::clone(&self.inner.api);
        let view: Weak<ViewInner> = Arc::downgrade(&self.inner);

        Ok(Some(tokio::spawn(async move {
            let result = api
                .append_message(&pending.session_id, &pending.message)
                .await;
            match view.upgrade() {
                Some(inner) => inner.finish_send(pending, result).await,
                None => {
                    tracing::debug!(id = %pending.session_id, "view dropped before send completed");
                    SendOutcome::ViewGone
                }
            }
        })))
    }

    /// Close the active session on the service, then start a fresh one
    ///
    /// # Returns
    ///
    /// Id of the session active afterwards
    ///
    /// # Errors
    ///
    /// - [`ParleyError::NoActiveSession`] when nothing is active.
    /// - The close error; the active session and its log are untouched.
    /// - The creation error when the close succeeded but no replacement could
    ///   be created; the view is then uninitialized.
    pub async fn finalize_session(&self) -> Result<SessionId> {
        let (id, title) = match &*self.inner.state.read().await {
            ViewState::Active(session) => (session.id.clone(), session.title.clone()),
            ViewState::Uninitialized => return Err(ParleyError::NoActiveSession.into()),
        };

        let title = (!title.trim().is_empty()).then_some(title.as_str());
        if let Err(e) = self.inner.api.close_session(&id, title).await {
            tracing::warn!(%id, "Error saving chat: {:#}", e);
            return Err(e);
        }
        tracing::info!(%id, "session closed");

        {
            let mut state = self.inner.state.write().await;
            match &*state {
                ViewState::Active(current) if current.id == id => {
                    *state = ViewState::Uninitialized;
                }
                ViewState::Active(current) => {
                    // Another session was selected while the close was in flight.
                    tracing::debug!(closed = %id, active = %current.id, "keeping newer selection");
                    return Ok(current.id.clone());
                }
                ViewState::Uninitialized => {}
            }
        }

        let fresh = self
            .inner
            .directory
            .create_session(&self.inner.new_session_title)
            .await?;
        let fresh_id = fresh.id.clone();

        let mut state = self.inner.state.write().await;
        if let ViewState::Active(current) = &*state {
            tracing::debug!(active = %current.id, "selection made during bootstrap wins");
            return Ok(current.id.clone());
        }
        *state = ViewState::Active(fresh);
        tracing::info!(id = %fresh_id, "fresh session started");
        Ok(fresh_id)
    }

    /// Append the user message locally, ahead of any network traffic
    async fn begin_send(&self, text: &str) -> Result<Option<PendingSend>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let message = Message::user(text);
        let mut state = self.inner.state.write().await;
        match &mut *state {
            ViewState::Active(session) => {
                session.messages.push(message.clone());
                Ok(Some(PendingSend {
                    session_id: session.id.clone(),
                    message,
                }))
            }
            ViewState::Uninitialized => Err(ParleyError::NoActiveSession.into()),
        }
    }
}

impl ViewInner {
    /// Apply the service's answer to a pending send
    async fn finish_send(
        &self,
        pending: PendingSend,
        result: Result<Option<Message>>,
    ) -> SendOutcome {
        match result {
            Ok(None) => SendOutcome::Delivered,
            Ok(Some(mut reply)) => {
                reply.sender = Sender::Assistant;
                let mut state = self.state.write().await;
                match &mut *state {
                    ViewState::Active(session) if session.id == pending.session_id => {
                        session.messages.push(reply.clone());
                        SendOutcome::Replied(reply)
                    }
                    _ => {
                        tracing::debug!(id = %pending.session_id, "reply for inactive session dropped");
                        SendOutcome::Discarded
                    }
                }
            }
            Err(e) => {
                tracing::warn!(id = %pending.session_id, "Error sending message: {:#}", e);
                SendOutcome::Unconfirmed(format!("{:#}", e))
            }
        }
    }
}
