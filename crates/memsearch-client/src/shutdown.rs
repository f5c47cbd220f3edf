//! Teardown on process shutdown
//!
//! Two hooks keep sockets from outliving the process: a background task that
//! runs [`ClientRegistry::cleanup_all`] on SIGINT/SIGTERM and then exits, and
//! an [`ExitGuard`] that releases the cached session when the host's main
//! scope ends.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::registry::ClientRegistry;

/// Signal that triggered teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl ShutdownSignal {
    /// Conventional exit status for a process ended by this signal (128 + signo).
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Interrupt => 128 + 2,
            Self::Terminate => 128 + 15,
        }
    }
}

/// What the listener does once the registry is cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownAction {
    /// End the process with [`ShutdownSignal::exit_code`].
    #[default]
    Exit,
    /// Resolve [`ShutdownHooks::wait`] and leave exiting to the host.
    ///
    /// The signal handlers stay registered, so the host must exit on its own
    /// or it will no longer stop on SIGINT/SIGTERM.
    Return,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Handle to the installed signal listener.
pub struct ShutdownHooks {
    handle: JoinHandle<Option<ShutdownSignal>>,
}

impl ShutdownHooks {
    /// Wait until a signal arrived and the registry was cleaned up.
    ///
    /// Only returns a signal under [`ShutdownAction::Return`]; with the default
    /// action the process exits first. Returns `None` if the listener was
    /// aborted or failed.
    pub async fn wait(self) -> Option<ShutdownSignal> {
        match self.handle.await {
            Ok(signal) => signal,
            Err(e) => {
                if !e.is_cancelled() {
                    warn!("Shutdown listener failed: {}", e);
                }
                None
            }
        }
    }

    /// Stop listening for signals.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Releases the registry's cached session when dropped.
///
/// The session's sockets are closed even if the caller still holds an `Arc`
/// to it. A call waiting for a reply is cancelled and drops the sockets as
/// it returns. Covers normal exit paths where no async cleanup gets to run.
#[must_use = "the session is released when the guard is dropped"]
pub struct ExitGuard {
    registry: Arc<ClientRegistry>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if let Some(session) = self.registry.discard() {
            info!(
                workspace = %session.workspace().display(),
                "Releasing search coordinator session on exit"
            );
            session.release();
        }
    }
}

impl ClientRegistry {
    /// Listen for SIGINT and SIGTERM, clean up the registry on receipt, then
    /// exit the process with the signal's conventional status.
    ///
    /// Installs at most once per registry: later calls return `Ok(None)`.
    /// Signal handlers are registered before this returns, so a signal
    /// delivered afterwards is never missed. Must be called within a tokio
    /// runtime.
    pub fn install_shutdown_hooks(self: &Arc<Self>) -> io::Result<Option<ShutdownHooks>> {
        self.install_shutdown_hooks_with(ShutdownAction::Exit)
    }

    /// Like [`install_shutdown_hooks`](Self::install_shutdown_hooks), with the
    /// post-cleanup behaviour chosen by the host.
    pub fn install_shutdown_hooks_with(
        self: &Arc<Self>,
        action: ShutdownAction,
    ) -> io::Result<Option<ShutdownHooks>> {
        if !self.mark_hooks_installed() {
            return Ok(None);
        }

        let signals = SignalListener::register()?;
        let registry = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let signal = signals.recv().await;
            info!(%signal, "Shutdown signal received, closing search coordinator session");
            registry.cleanup_all().await;

            if action == ShutdownAction::Exit {
                let code = signal.exit_code();
                info!(%signal, code, "Exiting after shutdown signal");
                std::process::exit(code);
            }
            Some(signal)
        });

        Ok(Some(ShutdownHooks { handle }))
    }

    /// Guard that releases the cached session when dropped.
    pub fn exit_guard(self: &Arc<Self>) -> ExitGuard {
        ExitGuard {
            registry: Arc::clone(self),
        }
    }
}

struct SignalListener {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

impl SignalListener {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.interrupt.recv() => ShutdownSignal::Interrupt,
            _ = self.terminate.recv() => ShutdownSignal::Terminate,
        }
    }
}
