//! Client library for the memsearch search coordinator
//!
//! A workspace process hands text searches to a separately running
//! coordinator over two Unix sockets:
//!
//! ```text
//!  ClientRegistry ──get_client(ws)──> ClientSession
//!                                        │
//!          initialize():  connect ──> <ws>/mem_search_service_requests.sock   (shared)
//!                         alloc_pid ──> reply on the same socket
//!                         connect ──> <ws>/qwen_code_response_<pid>.sock      (private)
//!                                        │
//!          request_search(): request_grep on the shared socket,
//!                            reply on the private socket
//! ```
//!
//! A host that wants to run its own shutdown after the sockets are closed
//! installs the hooks with [`ShutdownAction::Return`] and awaits
//! [`ShutdownHooks::wait`] before exiting itself.
//!
//! Every failure is returned to the caller with the stage it happened in;
//! nothing is retried here. A caller that cannot get a session should fall
//! back to running the search itself.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use memsearch_client::{ClientConfig, ClientRegistry, SearchOptions};
//!
//! let registry = Arc::new(ClientRegistry::new(ClientConfig::from_env()?));
//! // SIGINT/SIGTERM: clean up, then exit with status 130/143.
//! registry.install_shutdown_hooks()?;
//! // Normal return from main: release the session's sockets.
//! let _guard = registry.exit_guard();
//!
//! match registry.initialize_client(&workspace).await {
//!     Ok(_) => {
//!         let options = SearchOptions::new().with_line_number(true);
//!         let text = registry
//!             .request_search(&workspace, "fn main", &["src".into()], Some(options))
//!             .await?;
//!         println!("{text}");
//!     }
//!     Err(e) => run_search_directly(e),
//! }
//! ```

mod allocator;
mod channel;
pub mod config;
pub mod connector;
mod correlator;
mod error;
mod registry;
mod session;
mod shutdown;

pub use config::{ClientConfig, ConfigError};
pub use error::{Channel, ClientError, ErrorKind, Result, Stage};
pub use registry::ClientRegistry;
pub use session::{ClientSession, SessionState};
pub use shutdown::{ExitGuard, ShutdownAction, ShutdownHooks, ShutdownSignal};

// Protocol types callers need to build requests.
pub use memsearch_protocol::{Request, Response, ResponseStatus, SearchOptions, SocketLayout};
