//! Client session: one workspace, two sockets

use std::fmt;
use std::path::{Path, PathBuf};

use memsearch_protocol::{Request, Response, SearchOptions};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::allocator;
use crate::channel::{Channels, RequestChannel};
use crate::config::ClientConfig;
use crate::connector;
use crate::correlator;
use crate::error::{Channel, ClientError, ErrorKind, Result, Stage};

/// Lifecycle of a [`ClientSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No sockets open. Initial state, and the state after `cleanup()`.
    Uninitialized,
    /// `initialize()` is connecting or allocating.
    Initializing,
    /// Both sockets open; requests may be sent.
    Ready,
    /// `cleanup()` is tearing the sockets down.
    Closed,
    /// The last `initialize()` attempt failed. Its partial sockets are released.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A connection to the search coordinator for one workspace
///
/// Calls on one session are serialized: the channel pair sits behind a single
/// async mutex that each exchange holds from write until its reply is read.
/// `cleanup()` cancels whatever call is waiting before it takes that lock.
pub struct ClientSession {
    workspace: PathBuf,
    pid: u32,
    config: ClientConfig,
    state: SyncMutex<SessionState>,
    channels: Mutex<Channels>,
    cancel: SyncMutex<CancellationToken>,
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("workspace", &self.workspace)
            .field("pid", &self.pid)
            .field("state", &self.state())
            .finish()
    }
}

impl ClientSession {
    /// Create an uninitialized session for `workspace` using the current process id.
    pub fn new(workspace: impl AsRef<Path>, config: ClientConfig) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            pid: std::process::id(),
            config,
            state: SyncMutex::new(SessionState::Uninitialized),
            channels: Mutex::new(Channels::default()),
            cancel: SyncMutex::new(CancellationToken::new()),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Process id this session allocates its reply channel under.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    pub fn request_socket_path(&self) -> PathBuf {
        self.config.layout.request_socket_path(&self.workspace)
    }

    pub fn reply_socket_path(&self) -> PathBuf {
        self.config
            .layout
            .response_socket_path(&self.workspace, self.pid)
    }

    fn set_state(&self, state: SessionState) {
        let mut current = self.state.lock();
        let previous = *current;
        if previous != state {
            debug!(
                workspace = %self.workspace.display(),
                from = %previous,
                to = %state,
                "Session state change"
            );
            *current = state;
        }
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    /// Connect the request channel and allocate the reply channel.
    ///
    /// Does nothing when already ready. On failure every socket opened along
    /// the way is released and the session moves to [`SessionState::Failed`].
    pub async fn initialize(&self) -> Result<()> {
        let mut channels = self.channels.lock().await;
        if self.is_ready() {
            return Ok(());
        }

        self.set_state(SessionState::Initializing);
        channels.release();

        let cancel = self.cancel_token();
        match self.establish(&mut channels, &cancel).await {
            Ok(()) => {
                self.set_state(SessionState::Ready);
                info!(
                    workspace = %self.workspace.display(),
                    pid = self.pid,
                    "Search coordinator session ready"
                );
                Ok(())
            }
            Err(e) => {
                channels.release();
                self.set_state(SessionState::Failed);
                debug!(workspace = %self.workspace.display(), "Initialization failed: {}", e);
                Err(e)
            }
        }
    }

    async fn establish(&self, channels: &mut Channels, cancel: &CancellationToken) -> Result<()> {
        let request_path = self.request_socket_path();
        let stream = connector::connect(&request_path, self.config.connect_timeout())
            .await
            .map_err(|e| ClientError::initialization(Stage::Connect, e))?;
        channels.request = Some(RequestChannel::new(stream));

        allocator::allocate(channels, &self.workspace, self.pid, &self.config, cancel)
            .await
            .map_err(|e| ClientError::initialization(Stage::Allocate, e))
    }

    /// Send one request and wait for its reply.
    ///
    /// Requires a ready session. Transport failures come back wrapped with
    /// the send-request stage; the session stays usable afterwards, except
    /// after a reply timeout, which leaves an unread reply in flight and so
    /// releases the sockets.
    pub async fn send_request(&self, request: &Request) -> Result<Response> {
        let mut channels = self.channels.lock().await;
        if !self.is_ready() {
            return Err(ClientError::NotInitialized);
        }

        let cancel = self.cancel_token();
        let result =
            correlator::exchange(&mut channels, request, &cancel, self.config.response_timeout())
                .await;

        match result {
            Ok(response) => Ok(response),
            Err(e) => {
                if cancel.is_cancelled() {
                    // Released while this call waited; finish the release here.
                    channels.release();
                    self.set_state(SessionState::Uninitialized);
                } else if e.kind() == ErrorKind::ResponseTimeout {
                    warn!(
                        workspace = %self.workspace.display(),
                        "Reply timed out; dropping session sockets"
                    );
                    channels.release();
                    self.set_state(SessionState::Failed);
                }
                Err(ClientError::request(e))
            }
        }
    }

    /// Run a search through the coordinator and return its text output.
    ///
    /// A reply with failure status is [`ClientError::SearchFailed`], distinct
    /// from any transport error.
    pub async fn request_search(
        &self,
        pattern: &str,
        paths: &[String],
        options: Option<SearchOptions>,
    ) -> Result<String> {
        if !self.is_ready() {
            return Err(ClientError::NotInitialized);
        }

        let options = options.filter(|o| !o.is_empty());
        let request = Request::search(self.pid, pattern, paths.to_vec(), options);
        let response = self.send_request(&request).await?;

        if !response.is_success() {
            return Err(ClientError::SearchFailed {
                pattern: pattern.to_string(),
            });
        }

        response.into_text().ok_or_else(|| {
            ClientError::request(ClientError::ProtocolParse {
                channel: Channel::Reply,
                source: memsearch_protocol::CodecError::MissingField("text"),
            })
        })
    }

    /// Close both sockets and return to [`SessionState::Uninitialized`].
    ///
    /// Safe to call repeatedly. A call waiting for a reply is failed with
    /// [`ClientError::UnexpectedClosure`]. Close errors are logged, never returned.
    pub async fn cleanup(&self) {
        self.cancel.lock().cancel();

        let mut channels = self.channels.lock().await;
        if !channels.is_empty() {
            self.set_state(SessionState::Closed);
            channels.close().await;
            debug!(workspace = %self.workspace.display(), "Session cleaned up");
        }
        self.set_state(SessionState::Uninitialized);

        *self.cancel.lock() = CancellationToken::new();
    }

    /// Drop both sockets without awaiting a graceful close.
    ///
    /// For synchronous teardown paths such as `Drop`. A call waiting for a
    /// reply is cancelled and drops the sockets itself as it returns.
    pub fn release(&self) {
        let previous = std::mem::replace(&mut *self.cancel.lock(), CancellationToken::new());
        previous.cancel();

        if let Ok(mut channels) = self.channels.try_lock() {
            channels.release();
            self.set_state(SessionState::Uninitialized);
            debug!(workspace = %self.workspace.display(), "Session released");
        }
    }
}
