//! Bounded Unix socket connect

use std::io;
use std::path::Path;
use std::time::Duration;

use tokio::net::UnixStream;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Open a stream to the socket at `path`, giving up after `timeout`.
///
/// When the timeout fires the pending connect future is dropped, which
/// closes the half-open socket before the error is returned.
pub async fn connect(path: &Path, timeout: Duration) -> Result<UnixStream> {
    debug!(path = %path.display(), ?timeout, "Connecting to socket");

    match tokio::time::timeout(timeout, UnixStream::connect(path)).await {
        Ok(Ok(stream)) => {
            debug!(path = %path.display(), "Connected");
            Ok(stream)
        }
        Ok(Err(source)) if source.kind() == io::ErrorKind::ConnectionRefused => {
            Err(ClientError::ConnectionRefused {
                path: path.to_path_buf(),
                source,
            })
        }
        Ok(Err(source)) => Err(ClientError::ConnectionError {
            path: path.to_path_buf(),
            source,
        }),
        Err(_) => Err(ClientError::ConnectionTimeout {
            path: path.to_path_buf(),
            timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_connect_succeeds_with_listener() {
        let tmp = TempDir::new().unwrap();
        let sock_path = tmp.path().join("live.sock");
        let listener = UnixListener::bind(&sock_path).unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });
        let stream = connect(&sock_path, Duration::from_secs(1)).await;

        assert!(stream.is_ok());
        accept.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connect_missing_socket_is_connection_error() {
        let tmp = TempDir::new().unwrap();
        let sock_path = tmp.path().join("nonexistent.sock");

        let err = connect(&sock_path, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionError);
        assert!(err.to_string().contains("Failed to connect to socket"));
        assert!(err.to_string().contains("nonexistent.sock"));
    }

    #[tokio::test]
    async fn test_connect_stale_socket_is_refused() {
        let tmp = TempDir::new().unwrap();
        let sock_path = tmp.path().join("stale.sock");

        // Binding then dropping leaves the socket file with nobody listening.
        drop(std::os::unix::net::UnixListener::bind(&sock_path).unwrap());
        assert!(sock_path.exists());

        let err = connect(&sock_path, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
        assert!(err.to_string().contains("Failed to connect to socket"));
    }

    #[tokio::test]
    async fn test_connect_regular_file_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("not-a-socket");
        std::fs::write(&path, "plain file").unwrap();

        let err = connect(&path, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::ConnectionError | ErrorKind::ConnectionRefused
        ));
    }
}
