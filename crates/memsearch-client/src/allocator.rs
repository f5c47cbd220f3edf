//! Reply channel allocation handshake
//!
//! The coordinator only creates a client's private reply socket after it has
//! accepted an `alloc_pid` request, so the reply socket is never dialled
//! before that request succeeds.

use std::path::Path;

use memsearch_protocol::Request;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::channel::{Channels, ReplyChannel};
use crate::config::ClientConfig;
use crate::connector;
use crate::correlator;
use crate::error::{ClientError, Result};

/// Ask the coordinator for a reply channel bound to `pid`, then connect to it.
///
/// `channels.request` must already be open. On success `channels.reply` and
/// `channels.reply_path` are set.
pub(crate) async fn allocate(
    channels: &mut Channels,
    workspace: &Path,
    pid: u32,
    config: &ClientConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    let request = Request::allocate_session(pid, workspace.to_string_lossy());
    let response =
        correlator::exchange(channels, &request, cancel, config.response_timeout()).await?;

    if !response.is_success() {
        return Err(ClientError::AllocationDenied {
            pid,
            workspace: workspace.to_path_buf(),
        });
    }

    let reply_path = config.layout.response_socket_path(workspace, pid);
    debug!(pid, path = %reply_path.display(), "Allocation granted, opening reply channel");

    let stream = connector::connect(&reply_path, config.connect_timeout()).await?;
    channels.reply = Some(ReplyChannel::new(stream));
    channels.reply_path = Some(reply_path);

    Ok(())
}
