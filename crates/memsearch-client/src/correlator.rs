//! One request out, one reply in
//!
//! Each exchange writes a single line to the request channel and reads a
//! single line back from whichever channel answers that kind of request.
//! There is no pipelining: the caller holds the session's channel lock for
//! the whole exchange, so a reply can only ever reach the call that asked.

use std::io;
use std::time::{Duration, Instant};

use memsearch_protocol::{decode_line, encode_line, Request, Response};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::channel::Channels;
use crate::error::{Channel, ClientError, Result};

/// Send `request` and wait for its reply.
///
/// Failures are terminal for this call only. Cancelling `cancel` fails a
/// waiting call with [`ClientError::UnexpectedClosure`].
pub(crate) async fn exchange(
    channels: &mut Channels,
    request: &Request,
    cancel: &CancellationToken,
    response_timeout: Option<Duration>,
) -> Result<Response> {
    let start = Instant::now();

    if cancel.is_cancelled() {
        return Err(ClientError::UnexpectedClosure {
            channel: Channel::Request,
        });
    }

    let line = encode_line(request).map_err(|e| ClientError::Transport {
        channel: Channel::Request,
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;

    let request_channel = channels
        .request
        .as_mut()
        .ok_or(ClientError::NotInitialized)?;

    trace!(kind = request.kind(), pid = request.pid(), "Sending request");
    write_line(&mut request_channel.writer, &line).await?;

    let response = if request.replies_on_request_channel() {
        read_reply(
            &mut request_channel.reader,
            Channel::Request,
            cancel,
            response_timeout,
        )
        .await?
    } else {
        let reply_channel = channels.reply.as_mut().ok_or(ClientError::NotInitialized)?;
        read_reply(
            &mut reply_channel.reader,
            Channel::Reply,
            cancel,
            response_timeout,
        )
        .await?
    };

    debug!(
        kind = request.kind(),
        status = u8::from(response.status()),
        total_ms = start.elapsed().as_micros() as f64 / 1000.0,
        "Request completed"
    );

    Ok(response)
}

async fn write_line<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let to_transport = |source| ClientError::Transport {
        channel: Channel::Request,
        source,
    };
    writer.write_all(line.as_bytes()).await.map_err(to_transport)?;
    writer.flush().await.map_err(to_transport)
}

/// Read and decode exactly one line from `reader`.
pub(crate) async fn read_reply<R>(
    reader: &mut R,
    channel: Channel,
    cancel: &CancellationToken,
    response_timeout: Option<Duration>,
) -> Result<Response>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();

    let bytes_read = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(ClientError::UnexpectedClosure { channel });
        }
        result = read_line_bounded(reader, &mut line, channel, response_timeout) => result?,
    };

    if bytes_read == 0 {
        return Err(ClientError::UnexpectedClosure { channel });
    }

    trace!(%channel, bytes = bytes_read, "Received reply");

    decode_line(&line).map_err(|source| ClientError::ProtocolParse { channel, source })
}

async fn read_line_bounded<R>(
    reader: &mut R,
    line: &mut String,
    channel: Channel,
    response_timeout: Option<Duration>,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let read = reader.read_line(line);
    let result = match response_timeout {
        Some(timeout) => tokio::time::timeout(timeout, read)
            .await
            .map_err(|_| ClientError::ResponseTimeout { channel, timeout })?,
        None => read.await,
    };

    result.map_err(|source| match source.kind() {
        io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof => {
            ClientError::UnexpectedClosure { channel }
        }
        _ => ClientError::Transport { channel, source },
    })
}
