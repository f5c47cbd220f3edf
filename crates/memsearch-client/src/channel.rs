//! Socket handles owned by a session

use std::path::PathBuf;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::error::Channel;

/// The shared request socket: written for every request, read for allocation replies.
pub(crate) struct RequestChannel {
    pub(crate) reader: BufReader<OwnedReadHalf>,
    pub(crate) writer: OwnedWriteHalf,
}

impl RequestChannel {
    pub(crate) fn new(stream: UnixStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }
}

/// The private reply socket; only ever read.
pub(crate) struct ReplyChannel {
    pub(crate) reader: BufReader<UnixStream>,
}

impl ReplyChannel {
    pub(crate) fn new(stream: UnixStream) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }
}

/// Both handles of one session. Either may be absent.
#[derive(Default)]
pub(crate) struct Channels {
    pub(crate) request: Option<RequestChannel>,
    pub(crate) reply: Option<ReplyChannel>,
    pub(crate) reply_path: Option<PathBuf>,
}

impl Channels {
    pub(crate) fn is_empty(&self) -> bool {
        self.request.is_none() && self.reply.is_none()
    }

    /// Close whatever is open. Close failures are logged and otherwise ignored;
    /// the descriptors are released either way.
    pub(crate) async fn close(&mut self) {
        if let Some(mut request) = self.request.take() {
            if let Err(e) = request.writer.shutdown().await {
                warn!(channel = %Channel::Request, "Error closing channel: {}", e);
            }
            debug!(channel = %Channel::Request, "Channel closed");
        }

        if let Some(mut reply) = self.reply.take() {
            if let Err(e) = reply.reader.get_mut().shutdown().await {
                warn!(channel = %Channel::Reply, "Error closing channel: {}", e);
            }
            debug!(
                channel = %Channel::Reply,
                path = ?self.reply_path,
                "Channel closed"
            );
        }

        // The reply socket file belongs to the coordinator; leave it in place.
        self.reply_path = None;
    }

    /// Drop both handles without a graceful shutdown.
    pub(crate) fn release(&mut self) {
        self.request = None;
        self.reply = None;
        self.reply_path = None;
    }
}
