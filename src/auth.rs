//! Authentication gate
//!
//! [`AuthGate`] owns the process-wide "is the user authenticated" fact.
//! It is the only writer; every other component reads the state through
//! [`AuthGate::state`] or a [`tokio::sync::watch::Receiver`] obtained from
//! [`AuthGate::subscribe`].
//!
//! The state starts [`AuthState::Unknown`], is resolved by a single probe
//! per mount, and only returns to `Unknown` through [`AuthGate::logout`].

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::api::{ChatApi, Credentials, Profile};
use crate::error::{ParleyError, Result};

/// Resolution of the authentication probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Not yet probed since the last mount
    Unknown,
    /// The service accepted the ambient credential
    Authenticated,
    /// The service rejected the credential, or could not be reached
    Unauthenticated,
}

impl AuthState {
    /// True only for [`AuthState::Authenticated`]
    pub fn is_authenticated(self) -> bool {
        self == AuthState::Authenticated
    }
}

/// Single writer of [`AuthState`]
#[derive(Debug)]
pub struct AuthGate {
    api: Arc<dyn ChatApi>,
    state: watch::Sender<AuthState>,
    probe: Mutex<()>,
}

impl AuthGate {
    /// Create a gate in the [`AuthState::Unknown`] state
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            api,
            state,
            probe: Mutex::new(()),
        }
    }

    /// Current authentication state
    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Receiver that observes every transition
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Resolve the state with one probe, if it is still unknown
    ///
    /// A failed probe resolves to [`AuthState::Unauthenticated`]; it is never
    /// reported as an error and never leaves the state at `Unknown`.
    pub async fn check_auth(&self) -> AuthState {
        let _probe = self.probe.lock().await;
        let current = self.state();
        if current != AuthState::Unknown {
            return current;
        }

        let resolved = match self.api.check_auth().await {
            Ok(true) => AuthState::Authenticated,
            Ok(false) => AuthState::Unauthenticated,
            Err(e) => {
                tracing::warn!("Auth check failed: {:#}", e);
                AuthState::Unauthenticated
            }
        };
        tracing::info!(state = ?resolved, "authentication resolved");
        self.state.send_replace(resolved);
        resolved
    }

    /// Log in; on success the state becomes [`AuthState::Authenticated`]
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::Authentication`] with "Invalid credentials" when
    /// the service rejects the login, or a generic failure message when the
    /// request could not be completed. The state is left unchanged.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        match self.api.login(credentials).await {
            Ok(()) => {
                tracing::info!(email = %credentials.email, "login succeeded");
                self.state.send_replace(AuthState::Authenticated);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Login failed: {:#}", e);
                Err(auth_failure(&e, "Invalid credentials").into())
            }
        }
    }

    /// Register an account; does not authenticate
    ///
    /// A successful signup only permits a subsequent [`AuthGate::login`].
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::Authentication`] with "Signup failed" when the
    /// service rejects the signup, or a generic failure message when the
    /// request could not be completed.
    pub async fn signup(&self, profile: &Profile) -> Result<()> {
        self.api.signup(profile).await.map_err(|e| {
            tracing::warn!("Signup failed: {:#}", e);
            anyhow::anyhow!(auth_failure(&e, "Signup failed"))
        })?;
        tracing::info!(email = %profile.email, "signup succeeded");
        Ok(())
    }

    /// Log out and reset the state to [`AuthState::Unknown`]
    ///
    /// The reset happens whatever the outcome of the logout request.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!("Logout request failed: {:#}", e);
        }
        self.state.send_replace(AuthState::Unknown);
        tracing::info!("logged out; authentication state reset");
    }
}

fn auth_failure(err: &anyhow::Error, rejected: &str) -> ParleyError {
    match err.downcast_ref::<ParleyError>() {
        Some(e) if e.is_transport_like() => {
            ParleyError::Authentication(format!("Request failed: {}", e))
        }
        _ => ParleyError::Authentication(rejected.to_string()),
    }
}
