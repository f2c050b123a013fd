//! Authentication-gated composition of the chat components
//!
//! [`Shell`] wires an [`AuthGate`] in front of a [`ChatTree`]: the directory,
//! its poller and the conversation view exist only while the user is
//! authenticated. Logging out tears the tree down, which cancels polling.

use std::sync::Arc;

use crate::api::{ChatApi, Credentials, Profile};
use crate::auth::{AuthGate, AuthState};
use crate::config::SyncConfig;
use crate::conversation::ConversationView;
use crate::directory::{PollHandle, SessionDirectory};
use crate::error::{ParleyError, Result};
use crate::session::SessionId;

/// Components mounted while authenticated
#[derive(Debug)]
pub struct ChatTree {
    directory: SessionDirectory,
    view: ConversationView,
    poller: PollHandle,
}

impl ChatTree {
    /// The session directory
    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    /// The conversation view
    pub fn view(&self) -> &ConversationView {
        &self.view
    }

    /// Whether directory polling is running
    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    async fn unmount(self) {
        self.poller.unmount().await;
        tracing::debug!("chat tree unmounted");
    }
}

/// Top-level client state
#[derive(Debug)]
pub struct Shell {
    api: Arc<dyn ChatApi>,
    auth: AuthGate,
    sync: SyncConfig,
    tree: Option<ChatTree>,
}

impl Shell {
    /// Create an unmounted shell
    ///
    /// # Arguments
    ///
    /// * `api` - Service client shared by every component
    /// * `sync` - Polling period and session titles
    pub fn new(api: Arc<dyn ChatApi>, sync: SyncConfig) -> Self {
        let auth = AuthGate::new(Arc::clone(&api));
        Self {
            api,
            auth,
            sync,
            tree: None,
        }
    }

    /// The authentication gate
    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    /// Current authentication state
    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    /// The mounted chat tree, if authenticated
    pub fn chat(&self) -> Option<&ChatTree> {
        self.tree.as_ref()
    }

    /// Probe authentication and mount the chat tree when authenticated
    pub async fn mount(&mut self) -> AuthState {
        let state = self.auth.check_auth().await;
        if state.is_authenticated() {
            self.mount_tree().await;
        }
        state
    }

    /// Log in and mount the chat tree
    ///
    /// # Errors
    ///
    /// Returns the [`ParleyError::Authentication`] reported by the gate
    pub async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        self.auth.login(credentials).await?;
        self.mount_tree().await;
        Ok(())
    }

    /// Register an account; a separate [`Shell::login`] is still required
    ///
    /// # Errors
    ///
    /// Returns the [`ParleyError::Authentication`] reported by the gate
    pub async fn signup(&self, profile: &Profile) -> Result<()> {
        self.auth.signup(profile).await
    }

    /// Tear down the chat tree, log out, and probe again
    pub async fn logout(&mut self) -> AuthState {
        self.unmount().await;
        self.auth.logout().await;
        self.mount().await
    }

    /// Tear down the chat tree, cancelling polling
    ///
    /// Requests still in flight are not cancelled; their completions are
    /// ignored once the view is gone.
    pub async fn unmount(&mut self) {
        if let Some(tree) = self.tree.take() {
            tree.unmount().await;
        }
    }

    /// Create a session and make it the active one
    ///
    /// An explicit new chat carries the list's fallback title, while the
    /// chat started on mount or after a save uses the bootstrap title.
    ///
    /// # Errors
    ///
    /// Fails when not authenticated or when the service cannot create a session
    pub async fn new_chat(&self) -> Result<SessionId> {
        let tree = self.mounted()?;
        let session = tree
            .directory
            .create_session(&self.sync.fallback_title)
            .await?;
        tree.view.select_or_init(Some(session)).await
    }

    /// Make a listed session the active one
    ///
    /// # Errors
    ///
    /// Fails when not authenticated or when the directory does not list `id`
    pub async fn select_session(&self, id: &SessionId) -> Result<SessionId> {
        let tree = self.mounted()?;
        let session = tree
            .directory
            .select_session(id)
            .await
            .ok_or_else(|| ParleyError::UnknownSession(id.to_string()))?;
        tree.view.select_or_init(Some(session)).await
    }

    fn mounted(&self) -> Result<&ChatTree> {
        self.tree
            .as_ref()
            .ok_or_else(|| ParleyError::Authentication("Not logged in".to_string()).into())
    }

    async fn mount_tree(&mut self) {
        if self.tree.is_some() {
            return;
        }
        let directory = SessionDirectory::new(Arc::clone(&self.api), &self.sync.fallback_title);
        let poller = directory.mount(self.sync.poll_interval());
        let view = ConversationView::new(
            Arc::clone(&self.api),
            directory.clone(),
            &self.sync.new_session_title,
        );
        if let Err(e) = view.select_or_init(None).await {
            // Stays uninitialized; the user can retry with a new chat.
            tracing::warn!("Could not start a session: {:#}", e);
        }
        tracing::info!("chat tree mounted");
        self.tree = Some(ChatTree {
            directory,
            view,
            poller,
        });
    }
}
