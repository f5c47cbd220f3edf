//! Socket addressing inside a workspace
//!
//! The coordinator listens on one shared request socket per workspace and
//! creates one private reply socket per client process.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the shared request socket.
pub const REQUEST_SOCKET_NAME: &str = "mem_search_service_requests.sock";

/// Prefix of each per-process reply socket (`<prefix><pid>.sock`).
pub const RESPONSE_SOCKET_PREFIX: &str = "qwen_code_response_";

/// Names of the coordinator's sockets relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketLayout {
    pub request_socket_name: String,
    pub response_socket_prefix: String,
}

impl Default for SocketLayout {
    fn default() -> Self {
        Self {
            request_socket_name: REQUEST_SOCKET_NAME.to_string(),
            response_socket_prefix: RESPONSE_SOCKET_PREFIX.to_string(),
        }
    }
}

impl SocketLayout {
    pub fn request_socket_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.request_socket_name)
    }

    /// Reply socket for `pid`; unique per process within one workspace.
    pub fn response_socket_path(&self, workspace: &Path, pid: u32) -> PathBuf {
        workspace.join(format!("{}{}.sock", self.response_socket_prefix, pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_socket_paths() {
        let layout = SocketLayout::default();
        let workspace = Path::new("/home/user/project");

        assert_eq!(
            layout.request_socket_path(workspace),
            PathBuf::from("/home/user/project/mem_search_service_requests.sock")
        );
        assert_eq!(
            layout.response_socket_path(workspace, 12345),
            PathBuf::from("/home/user/project/qwen_code_response_12345.sock")
        );
    }

    #[test]
    fn test_reply_paths_differ_per_pid() {
        let layout = SocketLayout::default();
        let workspace = Path::new("/w");
        assert_ne!(
            layout.response_socket_path(workspace, 1),
            layout.response_socket_path(workspace, 2)
        );
    }

    #[test]
    fn test_partial_layout_fills_defaults() {
        let layout: SocketLayout =
            serde_json::from_str(r#"{"request_socket_name":"custom.sock"}"#).unwrap();
        assert_eq!(layout.request_socket_name, "custom.sock");
        assert_eq!(layout.response_socket_prefix, RESPONSE_SOCKET_PREFIX);
    }
}
