//! Message types exchanged with the coordinator
//!
//! Requests carry a `type` discriminator. Replies do not: the caller knows
//! which kind of request it sent and therefore which reply shape to expect.

use serde::{Deserialize, Serialize};

/// A message sent from a client to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Ask the coordinator to create a private reply channel for `pid`.
    #[serde(rename = "alloc_pid")]
    AllocateSession {
        pid: u32,
        repo_dir_path: String,
    },

    /// Run a search; the reply arrives on the caller's private reply channel.
    #[serde(rename = "request_grep")]
    Search {
        pid: u32,
        pattern: String,
        paths: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<SearchOptions>,
    },
}

impl Request {
    pub fn allocate_session(pid: u32, repo_dir_path: impl Into<String>) -> Self {
        Self::AllocateSession {
            pid,
            repo_dir_path: repo_dir_path.into(),
        }
    }

    pub fn search(
        pid: u32,
        pattern: impl Into<String>,
        paths: Vec<String>,
        options: Option<SearchOptions>,
    ) -> Self {
        Self::Search {
            pid,
            pattern: pattern.into(),
            paths,
            options,
        }
    }

    /// Process identifier of the caller that sent this request.
    pub fn pid(&self) -> u32 {
        match self {
            Self::AllocateSession { pid, .. } | Self::Search { pid, .. } => *pid,
        }
    }

    /// Wire name of the request kind (`alloc_pid` / `request_grep`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AllocateSession { .. } => "alloc_pid",
            Self::Search { .. } => "request_grep",
        }
    }

    /// Whether the reply to this request comes back on the request channel.
    ///
    /// Only allocation replies do; everything else answers on the caller's
    /// private reply channel.
    pub fn replies_on_request_channel(&self) -> bool {
        matches!(self, Self::AllocateSession { .. })
    }
}

/// Flags forwarded to the coordinator's search engine as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_heading: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_filename: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_case: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regexp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub globs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_number(mut self, enabled: bool) -> Self {
        self.line_number = Some(enabled);
        self
    }

    pub fn with_no_heading(mut self, enabled: bool) -> Self {
        self.no_heading = Some(enabled);
        self
    }

    pub fn with_filename(mut self, enabled: bool) -> Self {
        self.with_filename = Some(enabled);
        self
    }

    pub fn with_ignore_case(mut self, enabled: bool) -> Self {
        self.ignore_case = Some(enabled);
        self
    }

    pub fn with_regexp(mut self, enabled: bool) -> Self {
        self.regexp = Some(enabled);
        self
    }

    pub fn with_glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }

    pub fn with_globs<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.globs = Some(globs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads);
        self
    }

    /// True when no flag is set; such options are not worth sending.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Binary outcome code carried by every reply (`0` failure, `1` success).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ResponseStatus {
    Failure,
    Success,
}

impl ResponseStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<ResponseStatus> for u8 {
    fn from(status: ResponseStatus) -> Self {
        match status {
            ResponseStatus::Failure => 0,
            ResponseStatus::Success => 1,
        }
    }
}

impl TryFrom<u8> for ResponseStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Failure),
            1 => Ok(Self::Success),
            other => Err(format!("invalid response_status {}, expected 0 or 1", other)),
        }
    }
}

/// Reply to [`Request::AllocateSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateSessionResult {
    pub response_status: ResponseStatus,
}

/// Reply to [`Request::Search`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub response_status: ResponseStatus,
    pub text: String,
}

/// Any reply from the coordinator.
///
/// `SearchResult` is tried first since it is the stricter shape; a line
/// without `text` decodes as an allocation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Search(SearchResult),
    AllocateSession(AllocateSessionResult),
}

impl Response {
    pub fn status(&self) -> ResponseStatus {
        match self {
            Self::Search(result) => result.response_status,
            Self::AllocateSession(result) => result.response_status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Search output, if this is a search reply.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Search(result) => Some(result.text),
            Self::AllocateSession(_) => None,
        }
    }
}
