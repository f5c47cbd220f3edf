//! Error types for the memsearch client

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Which of the two sockets an operation was using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Shared request socket; also carries allocation replies.
    Request,
    /// Private per-process reply socket.
    Reply,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Reply => write!(f, "reply"),
        }
    }
}

/// Pipeline stage a wrapped error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Allocate,
    SendRequest,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Allocate => write!(f, "allocate"),
            Self::SendRequest => write!(f, "send-request"),
        }
    }
}

/// Flat classification of a [`ClientError`], stage wrappers removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConnectionTimeout,
    ConnectionRefused,
    ConnectionError,
    AllocationDenied,
    ProtocolParseError,
    UnexpectedClosure,
    Transport,
    ResponseTimeout,
    NotInitialized,
    SearchFailed,
}

/// Errors that can occur while talking to the coordinator
///
/// Nothing here is retried internally. Callers branch on [`ClientError::kind`]
/// to decide whether to fall back to running the search themselves.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to socket {}: timed out after {timeout:?}", path.display())]
    ConnectionTimeout { path: PathBuf, timeout: Duration },

    #[error("Failed to connect to socket {}: connection refused", path.display())]
    ConnectionRefused {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to connect to socket {}: {source}", path.display())]
    ConnectionError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Coordinator denied session allocation for pid {pid} in {}", workspace.display())]
    AllocationDenied { pid: u32, workspace: PathBuf },

    #[error("Malformed reply on {channel} channel: {source}")]
    ProtocolParse {
        channel: Channel,
        #[source]
        source: memsearch_protocol::CodecError,
    },

    #[error("The {channel} channel closed before a reply arrived")]
    UnexpectedClosure { channel: Channel },

    #[error("Transport error on {channel} channel: {source}")]
    Transport {
        channel: Channel,
        #[source]
        source: io::Error,
    },

    #[error("No reply on {channel} channel within {timeout:?}")]
    ResponseTimeout { channel: Channel, timeout: Duration },

    #[error("Client is not initialized; call initialize() before sending requests")]
    NotInitialized,

    #[error("Coordinator reported a failed search for pattern '{pattern}'")]
    SearchFailed { pattern: String },

    #[error("Failed to initialize client ({stage} stage): {source}")]
    Initialization {
        stage: Stage,
        #[source]
        source: Box<ClientError>,
    },

    #[error("Request failed (send-request stage): {source}")]
    Request {
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    pub(crate) fn initialization(stage: Stage, source: ClientError) -> Self {
        Self::Initialization {
            stage,
            source: Box::new(source),
        }
    }

    pub(crate) fn request(source: ClientError) -> Self {
        Self::Request {
            source: Box::new(source),
        }
    }

    /// Stage the error was wrapped with, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Initialization { stage, .. } => Some(*stage),
            Self::Request { .. } => Some(Stage::SendRequest),
            _ => None,
        }
    }

    /// The innermost error, with stage wrappers peeled off.
    pub fn root(&self) -> &ClientError {
        match self {
            Self::Initialization { source, .. } | Self::Request { source } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Initialization { source, .. } | Self::Request { source } => source.kind(),
            Self::ConnectionTimeout { .. } => ErrorKind::ConnectionTimeout,
            Self::ConnectionRefused { .. } => ErrorKind::ConnectionRefused,
            Self::ConnectionError { .. } => ErrorKind::ConnectionError,
            Self::AllocationDenied { .. } => ErrorKind::AllocationDenied,
            Self::ProtocolParse { .. } => ErrorKind::ProtocolParseError,
            Self::UnexpectedClosure { .. } => ErrorKind::UnexpectedClosure,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::ResponseTimeout { .. } => ErrorKind::ResponseTimeout,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::SearchFailed { .. } => ErrorKind::SearchFailed,
        }
    }

    /// True for failures of the socket plumbing rather than of the search itself.
    pub fn is_transport(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::NotInitialized | ErrorKind::SearchFailed | ErrorKind::AllocationDenied
        )
    }
}
