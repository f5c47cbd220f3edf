//! Newline-delimited JSON framing
//!
//! One message per line, no length prefix. Decoding trims surrounding
//! whitespace, so a trailing `\n` or `\r\n` is accepted.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Received an empty line")]
    EmptyLine,

    #[error("Message is missing field `{0}`")]
    MissingField(&'static str),
}

/// Serialize `message` as a single JSON line terminated by `\n`.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, CodecError> {
    let mut line = serde_json::to_string(message).map_err(CodecError::Encode)?;
    line.push('\n');
    Ok(line)
}

/// Parse one received line as exactly one JSON value.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, CodecError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(CodecError::EmptyLine);
    }
    serde_json::from_str(trimmed).map_err(CodecError::Decode)
}

/// Parse a buffer holding several newline-terminated messages, in order.
///
/// Blank lines are skipped.
pub fn decode_lines<T: DeserializeOwned>(buffer: &str) -> Result<Vec<T>, CodecError> {
    buffer
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(decode_line)
        .collect()
}
