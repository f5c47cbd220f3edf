//! Wire protocol for the memsearch coordinator
//!
//! Messages are newline-delimited UTF-8 JSON, one complete object per line.
//! This crate has no I/O: it only describes the message shapes, how they are
//! framed, and where the coordinator's sockets live inside a workspace.

pub mod codec;
pub mod layout;
pub mod protocol;

pub use codec::{decode_line, decode_lines, encode_line, CodecError};
pub use layout::{SocketLayout, REQUEST_SOCKET_NAME, RESPONSE_SOCKET_PREFIX};
pub use protocol::{
    AllocateSessionResult, Request, Response, ResponseStatus, SearchOptions, SearchResult,
};
