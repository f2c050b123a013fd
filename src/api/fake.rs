//! In-process fake chat service for unit tests
//!
//! [`FakeChatApi`] keeps a tiny remote store in memory and records every
//! call, so tests can assert on both local state and the traffic that
//! produced it.
//!
//! # Failure and timing control
//!
//! - [`FakeChatApi::fail`] makes every call to an endpoint return a
//!   transport error until [`FakeChatApi::heal`] is called.
//! - [`FakeChatApi::hold_next`] parks the next call to an endpoint until the
//!   returned sender fires (or is dropped), which lets tests interleave
//!   completions in any order. State is snapshotted when the call starts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::api::{ChatApi, Credentials, Profile};
use crate::error::{ParleyError, Result};
use crate::session::{Message, Session, SessionId};

/// Service endpoints, used to target failures and holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CheckAuth,
    Signup,
    Login,
    Logout,
    ListSessions,
    CreateSession,
    AppendMessage,
    CloseSession,
}

#[derive(Debug, Default)]
struct Store {
    authenticated: bool,
    accounts: HashMap<String, String>,
    sessions: Vec<Session>,
    closed: Vec<SessionId>,
    next_id: u64,
    replies: VecDeque<Option<String>>,
    failing: HashSet<Endpoint>,
    holds: HashMap<Endpoint, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<Endpoint>,
}

/// In-memory [`ChatApi`] implementation
#[derive(Debug, Default)]
pub struct FakeChatApi {
    store: Mutex<Store>,
}

impl FakeChatApi {
    /// An empty service with no accounts and no sessions
    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose ambient credential is already valid
    pub fn authenticated() -> Self {
        let api = Self::new();
        api.store.lock().unwrap().authenticated = true;
        api
    }

    /// Register an account directly
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.store
            .lock()
            .unwrap()
            .accounts
            .insert(email.to_string(), password.to_string());
        self
    }

    /// Replace the remote session list
    pub fn set_sessions(&self, sessions: Vec<Session>) {
        self.store.lock().unwrap().sessions = sessions;
    }

    /// Queue the assistant reply for the next append; `None` means no reply
    pub fn reply_with(&self, reply: Option<&str>) {
        self.store
            .lock()
            .unwrap()
            .replies
            .push_back(reply.map(str::to_string));
    }

    /// Make every call to `endpoint` fail with a transport error
    pub fn fail(&self, endpoint: Endpoint) {
        self.store.lock().unwrap().failing.insert(endpoint);
    }

    /// Undo [`FakeChatApi::fail`]
    pub fn heal(&self, endpoint: Endpoint) {
        self.store.lock().unwrap().failing.remove(&endpoint);
    }

    /// Park the next call to `endpoint` until the returned sender fires
    pub fn hold_next(&self, endpoint: Endpoint) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.store
            .lock()
            .unwrap()
            .holds
            .entry(endpoint)
            .or_default()
            .push_back(rx);
        tx
    }

    /// Number of calls made to `endpoint`
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.store
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == endpoint)
            .count()
    }

    /// Total number of calls made to any endpoint
    pub fn total_calls(&self) -> usize {
        self.store.lock().unwrap().calls.len()
    }

    /// Whether the ambient credential is currently valid
    pub fn is_authenticated(&self) -> bool {
        self.store.lock().unwrap().authenticated
    }

    /// Ids that have been closed, in close order
    pub fn closed(&self) -> Vec<SessionId> {
        self.store.lock().unwrap().closed.clone()
    }

    /// Messages stored remotely for `id`
    pub fn remote_messages(&self, id: &SessionId) -> Vec<Message> {
        self.store
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// Record the call, then either fail or hand back the pending hold
    fn enter(&self, endpoint: Endpoint) -> Result<Option<oneshot::Receiver<()>>> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(endpoint);
        if store.failing.contains(&endpoint) {
            return Err(ParleyError::Transport(format!("{:?}: connection refused", endpoint)).into());
        }
        Ok(store.holds.get_mut(&endpoint).and_then(VecDeque::pop_front))
    }

    fn require_auth(&self) -> Result<()> {
        if self.store.lock().unwrap().authenticated {
            Ok(())
        } else {
            Err(ParleyError::Status {
                status: 401,
                body: "Missing token".to_string(),
            }
            .into())
        }
    }
}

async fn wait(hold: Option<oneshot::Receiver<()>>) {
    if let Some(rx) = hold {
        let _ = rx.await;
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn check_auth(&self) -> Result<bool> {
        let hold = self.enter(Endpoint::CheckAuth)?;
        wait(hold).await;
        Ok(self.is_authenticated())
    }

    async fn signup(&self, profile: &Profile) -> Result<()> {
        let hold = self.enter(Endpoint::Signup)?;
        wait(hold).await;
        let mut store = self.store.lock().unwrap();
        if store.accounts.contains_key(&profile.email) {
            return Err(ParleyError::Status {
                status: 400,
                body: "Email already exists".to_string(),
            }
            .into());
        }
        store
            .accounts
            .insert(profile.email.clone(), profile.password.clone());
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<()> {
        let hold = self.enter(Endpoint::Login)?;
        wait(hold).await;
        let mut store = self.store.lock().unwrap();
        match store.accounts.get(&credentials.email) {
            Some(password) if *password == credentials.password => {
                store.authenticated = true;
                Ok(())
            }
            _ => Err(ParleyError::Status {
                status: 400,
                body: "Invalid credentials".to_string(),
            }
            .into()),
        }
    }

    async fn logout(&self) -> Result<()> {
        let hold = self.enter(Endpoint::Logout)?;
        wait(hold).await;
        self.store.lock().unwrap().authenticated = false;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let hold = self.enter(Endpoint::ListSessions)?;
        self.require_auth()?;
        let snapshot = self.store.lock().unwrap().sessions.clone();
        wait(hold).await;
        Ok(snapshot)
    }

    async fn create_session(&self, title: &str) -> Result<SessionId> {
        let hold = self.enter(Endpoint::CreateSession)?;
        self.require_auth()?;
        wait(hold).await;
        let mut store = self.store.lock().unwrap();
        store.next_id += 1;
        let id = SessionId::new(format!("chat-{}", store.next_id));
        store.sessions.push(Session::empty(id.clone(), title));
        Ok(id)
    }

    async fn append_message(&self, id: &SessionId, message: &Message) -> Result<Option<Message>> {
        let hold = self.enter(Endpoint::AppendMessage)?;
        self.require_auth()?;
        wait(hold).await;
        let mut store = self.store.lock().unwrap();
        let reply = store.replies.pop_front().flatten().map(Message::assistant);
        let session = store
            .sessions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| ParleyError::Remote("Chat not found".to_string()))?;
        session.messages.push(message.clone());
        if let Some(reply) = &reply {
            session.messages.push(reply.clone());
        }
        Ok(reply)
    }

    async fn close_session(&self, id: &SessionId, _title: Option<&str>) -> Result<()> {
        let hold = self.enter(Endpoint::CloseSession)?;
        self.require_auth()?;
        wait(hold).await;
        let mut store = self.store.lock().unwrap();
        if !store.sessions.iter().any(|s| &s.id == id) {
            return Err(ParleyError::Status {
                status: 404,
                body: "Chat not found".to_string(),
            }
            .into());
        }
        store.closed.push(id.clone());
        Ok(())
    }
}
