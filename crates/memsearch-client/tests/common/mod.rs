//! In-process stand-in for the search coordinator
//!
//! Speaks the real wire protocol over real Unix sockets inside a temporary
//! workspace. Each instance follows a fixed script.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

pub const REQUEST_SOCKET: &str = "mem_search_service_requests.sock";
pub const RESPONSE_PREFIX: &str = "qwen_code_response_";

/// How the mock answers `request_grep`.
#[derive(Debug, Clone)]
pub enum SearchReply {
    /// Success with fixed text.
    Text(String),
    /// Success with text naming the pattern and paths that were asked for.
    Echo,
    /// `response_status: 0` with empty text.
    Fail,
    /// Exactly `{"response_status": <status>}`, no `text` field.
    BareStatus(u8),
    /// A line that is not JSON.
    Garbage,
    /// Close the reply socket instead of answering.
    Close,
    /// Never answer.
    Hang,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub grant_allocation: bool,
    pub search: SearchReply,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            grant_allocation: true,
            search: SearchReply::Echo,
        }
    }
}

impl Script {
    pub fn replying(search: SearchReply) -> Self {
        Self {
            search,
            ..Self::default()
        }
    }

    pub fn denying() -> Self {
        Self {
            grant_allocation: false,
            ..Self::default()
        }
    }
}

pub struct MockCoordinator {
    _temp_dir: TempDir,
    workspace: PathBuf,
    received: Arc<Mutex<Vec<Value>>>,
    handle: JoinHandle<()>,
}

impl MockCoordinator {
    pub async fn start(script: Script) -> Result<Self> {
        init_tracing();

        let temp_dir = tempfile::tempdir()?;
        let workspace = temp_dir.path().to_path_buf();
        let listener = UnixListener::bind(workspace.join(REQUEST_SOCKET))?;
        let received = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let workspace = workspace.clone();
            let received = Arc::clone(&received);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let workspace = workspace.clone();
                    let received = Arc::clone(&received);
                    let script = script.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, workspace, script, received).await
                        {
                            tracing::debug!("mock coordinator connection ended: {}", e);
                        }
                    });
                }
            })
        };

        Ok(Self {
            _temp_dir: temp_dir,
            workspace,
            received,
            handle,
        })
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn reply_socket(&self, pid: u32) -> PathBuf {
        self.workspace.join(format!("{}{}.sock", RESPONSE_PREFIX, pid))
    }

    /// Every message received so far, in arrival order.
    pub async fn received(&self) -> Vec<Value> {
        self.received.lock().await.clone()
    }

    pub async fn received_of_type(&self, kind: &str) -> Vec<Value> {
        self.received()
            .await
            .into_iter()
            .filter(|m| m["type"] == kind)
            .collect()
    }
}

impl Drop for MockCoordinator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(
    stream: UnixStream,
    workspace: PathBuf,
    script: Script,
    received: Arc<Mutex<Vec<Value>>>,
) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut reply_stream: Option<UnixStream> = None;

    while let Some(line) = lines.next_line().await? {
        let message: Value = serde_json::from_str(&line)?;
        received.lock().await.push(message.clone());

        match message["type"].as_str() {
            Some("alloc_pid") => {
                if !script.grant_allocation {
                    send(&mut write, json!({ "response_status": 0 })).await?;
                    continue;
                }

                let pid = message["pid"].as_u64().unwrap_or_default();
                let path = workspace.join(format!("{}{}.sock", RESPONSE_PREFIX, pid));
                let _ = std::fs::remove_file(&path);
                let reply_listener = UnixListener::bind(&path)?;

                send(&mut write, json!({ "response_status": 1 })).await?;
                let (stream, _) = reply_listener.accept().await?;
                reply_stream = Some(stream);
            }
            Some("request_grep") => {
                let Some(reply) = reply_stream.as_mut() else {
                    continue;
                };

                match &script.search {
                    SearchReply::Text(text) => {
                        send(reply, json!({ "response_status": 1, "text": text })).await?
                    }
                    SearchReply::Echo => {
                        let text = format!("{} in {}", message["pattern"], message["paths"]);
                        send(reply, json!({ "response_status": 1, "text": text })).await?
                    }
                    SearchReply::Fail => {
                        send(reply, json!({ "response_status": 0, "text": "" })).await?
                    }
                    SearchReply::BareStatus(status) => {
                        send(reply, json!({ "response_status": status })).await?
                    }
                    SearchReply::Garbage => reply.write_all(b"this is not json\n").await?,
                    SearchReply::Close => reply_stream = None,
                    SearchReply::Hang => {}
                }
            }
            _ => {}
        }
    }

    Ok(())
}

async fn send<W>(writer: &mut W, value: Value) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(&value)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
