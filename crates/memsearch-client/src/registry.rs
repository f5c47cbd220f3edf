//! At most one live session per process, keyed by workspace
//!
//! The registry is an ordinary value owned by the host's composition root.
//! It replaces its cached session whenever a different workspace is asked
//! for, so two sessions of one process never race to allocate the same
//! reply socket.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use memsearch_protocol::SearchOptions;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::session::ClientSession;

pub struct ClientRegistry {
    config: ClientConfig,
    current: Mutex<Option<Arc<ClientSession>>>,
    hooks_installed: AtomicBool,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl ClientRegistry {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            current: Mutex::new(None),
            hooks_installed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The cached session, if any.
    pub fn current(&self) -> Option<Arc<ClientSession>> {
        self.current.lock().clone()
    }

    /// Session for `workspace`, creating an uninitialized one when needed.
    ///
    /// A cached session for another workspace is dropped from the cache
    /// without being cleaned up; its sockets close once the last handle to
    /// it goes away.
    pub fn get_client(&self, workspace: impl AsRef<Path>) -> Arc<ClientSession> {
        let workspace = workspace.as_ref();
        let mut current = self.current.lock();

        if let Some(session) = current.as_ref() {
            if session.workspace() == workspace {
                return Arc::clone(session);
            }
            warn!(
                previous = %session.workspace().display(),
                next = %workspace.display(),
                "Replacing cached session for a different workspace"
            );
        }

        debug!(workspace = %workspace.display(), "Creating client session");
        let session = Arc::new(ClientSession::new(workspace, self.config.clone()));
        *current = Some(Arc::clone(&session));
        session
    }

    /// Get the session for `workspace` and make sure it is ready.
    pub async fn initialize_client(
        &self,
        workspace: impl AsRef<Path>,
    ) -> Result<Arc<ClientSession>> {
        let session = self.get_client(workspace);
        session.initialize().await?;
        Ok(session)
    }

    /// Search through the session for `workspace`.
    ///
    /// The session must have been initialized; this never initializes it.
    pub async fn request_search(
        &self,
        workspace: impl AsRef<Path>,
        pattern: &str,
        paths: &[String],
        options: Option<SearchOptions>,
    ) -> Result<String> {
        let session = self.get_client(workspace);
        session.request_search(pattern, paths, options).await
    }

    /// Clean up and forget the cached session. No-op when nothing is cached.
    pub async fn cleanup_all(&self) {
        let session = self.current.lock().take();
        if let Some(session) = session {
            session.cleanup().await;
        }
    }

    /// Alias of [`cleanup_all`](Self::cleanup_all) for host integrations.
    pub async fn cleanup_client(&self) {
        self.cleanup_all().await;
    }

    /// Forget the cached session without awaiting a graceful close.
    pub(crate) fn discard(&self) -> Option<Arc<ClientSession>> {
        self.current.lock().take()
    }

    pub(crate) fn mark_hooks_installed(&self) -> bool {
        !self.hooks_installed.swap(true, Ordering::SeqCst)
    }
}
