//! Session directory with periodic refresh
//!
//! [`SessionDirectory`] owns the client's list of known sessions and keeps
//! it fresh by polling the service. Each refresh replaces the whole list;
//! there is no merge and no sequencing guard, so whichever fetch resolves
//! last is what the directory shows.
//!
//! Polling is an explicit task bound to a [`PollHandle`]. Dropping the handle
//! (or calling [`PollHandle::unmount`]) cancels the task, including a fetch
//! that is still in flight, so no result lands after teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::ChatApi;
use crate::error::Result;
use crate::session::{Session, SessionId};

/// Shortest polling period accepted by [`SessionDirectory::mount`]
const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

/// Freshness-bounded mirror of the remote session list
///
/// Cloning is cheap and yields another handle to the same list.
#[derive(Debug, Clone)]
pub struct SessionDirectory {
    inner: Arc<DirectoryInner>,
}

#[derive(Debug)]
struct DirectoryInner {
    api: Arc<dyn ChatApi>,
    sessions: RwLock<Vec<Session>>,
    last_error: RwLock<Option<String>>,
    refreshes: AtomicU64,
    fallback_title: String,
}

impl SessionDirectory {
    /// Create an empty directory
    ///
    /// # Arguments
    ///
    /// * `api` - Service client
    /// * `fallback_title` - Title used when a session is created with a blank one
    pub fn new(api: Arc<dyn ChatApi>, fallback_title: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                api,
                sessions: RwLock::new(Vec::new()),
                last_error: RwLock::new(None),
                refreshes: AtomicU64::new(0),
                fallback_title: fallback_title.into(),
            }),
        }
    }

    /// Fetch the full session list and replace the local one with it
    ///
    /// On failure the last known-good list is kept and the error is recorded
    /// in [`SessionDirectory::last_error`].
    ///
    /// # Returns
    ///
    /// Number of sessions now listed
    ///
    /// # Errors
    ///
    /// Returns the service error; local state other than `last_error` is untouched
    pub async fn refresh(&self) -> Result<usize> {
        match self.inner.api.list_sessions().await {
            Ok(sessions) => {
                let count = sessions.len();
                *self.inner.sessions.write().await = sessions;
                *self.inner.last_error.write().await = None;
                self.inner.refreshes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(count, "session list refreshed");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!("Error fetching sessions: {:#}", e);
                *self.inner.last_error.write().await = Some(format!("{:#}", e));
                Err(e)
            }
        }
    }

    /// Start polling: one refresh now, then one every `period`
    ///
    /// The returned handle owns the task; dropping it stops polling.
    pub fn mount(&self, period: Duration) -> PollHandle {
        let period = period.max(MIN_POLL_PERIOD);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let directory = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            // Failures are recorded by refresh(); keep polling.
                            _ = directory.refresh() => {}
                        }
                    }
                }
            }
            tracing::debug!("session polling stopped");
        });

        tracing::info!(period_ms = period.as_millis() as u64, "session polling started");
        PollHandle {
            cancel,
            task: Some(task),
        }
    }

    /// Create a session on the service and append it to the local list
    ///
    /// A blank title is replaced with the fallback title. The new session is
    /// not selected; the caller decides what to do with the returned handle.
    ///
    /// # Errors
    ///
    /// Returns the service error; the local list is unchanged on failure
    pub async fn create_session(&self, title: &str) -> Result<Session> {
        let title = if title.trim().is_empty() {
            self.inner.fallback_title.as_str()
        } else {
            title
        };

        let id = self.inner.api.create_session(title).await.map_err(|e| {
            tracing::warn!("Error starting chat: {:#}", e);
            e
        })?;
        let session = Session::empty(id, title);

        let mut sessions = self.inner.sessions.write().await;
        if !sessions.iter().any(|s| s.id == session.id) {
            sessions.push(session.clone());
        }
        tracing::info!(id = %session.id, title = %session.title, "session created");
        Ok(session)
    }

    /// Hand off the listed session with the given id
    ///
    /// Does not fetch history; the handle carries whatever the last refresh
    /// delivered.
    pub async fn select_session(&self, id: &SessionId) -> Option<Session> {
        let selected = self.get(id).await;
        if selected.is_none() {
            tracing::debug!(%id, "selected session is not listed");
        }
        selected
    }

    /// Look up a listed session by id
    pub async fn get(&self, id: &SessionId) -> Option<Session> {
        self.inner
            .sessions
            .read()
            .await
            .iter()
            .find(|s| &s.id == id)
            .cloned()
    }

    /// Snapshot of the current list
    pub async fn sessions(&self) -> Vec<Session> {
        self.inner.sessions.read().await.clone()
    }

    /// Number of listed sessions
    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Whether the list is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.sessions.read().await.is_empty()
    }

    /// Error from the most recent failed refresh, cleared by the next success
    pub async fn last_error(&self) -> Option<String> {
        self.inner.last_error.read().await.clone()
    }

    /// Number of refreshes that replaced the list
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.load(Ordering::Relaxed)
    }

    /// Title shown for sessions with a blank title
    pub fn fallback_title(&self) -> &str {
        &self.inner.fallback_title
    }
}

/// Owner of a running poll task
///
/// Dropping the handle cancels polling.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Whether the poll task is still running
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
            && self
                .task
                .as_ref()
                .map(|task| !task.is_finished())
                .unwrap_or(false)
    }

    /// Cancel polling and wait for the task to finish
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("session polling task failed: {}", e);
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
