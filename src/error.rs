//! A dedicated error type for everything that can go wrong while building or
//! querying a blocklist filter: I/O, malformed artifacts, timeouts.
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum BlocklistError {
    Io(io::Error),
    Json(serde_json::Error),
    Http(reqwest::Error),
    ArtifactFetch { url: String, status: u16 },
    ArtifactAssembly(String),
    TrieFormat(String),
    BuildTimeout,
    NotReady,
    /// A prior build attempt failed; this is the recorded `last_exception`
    /// delivered to the batch of callers that were waiting on it.
    BuildFailed(String),
}

/// A specific custom `Result` for all functions in this crate.
pub type Result<T> = std::result::Result<T, BlocklistError>;

impl BlocklistError {
    pub fn trie_format(msg: impl Into<String>) -> Self {
        BlocklistError::TrieFormat(msg.into())
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        BlocklistError::ArtifactAssembly(msg.into())
    }

    pub fn build_failed(msg: impl Into<String>) -> Self {
        BlocklistError::BuildFailed(msg.into())
    }
}

impl fmt::Display for BlocklistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlocklistError::Io(e) => write!(f, "i/o error: {}", e),
            BlocklistError::Json(e) => write!(f, "manifest json error: {}", e),
            BlocklistError::Http(e) => write!(f, "http error: {}", e),
            BlocklistError::ArtifactFetch { url, status } => {
                write!(f, "fetch of {} failed with status {}", url, status)
            }
            BlocklistError::ArtifactAssembly(msg) => write!(f, "artifact assembly error: {}", msg),
            BlocklistError::TrieFormat(msg) => write!(f, "trie format error: {}", msg),
            BlocklistError::BuildTimeout => write!(f, "timed out waiting for blocklist build"),
            BlocklistError::NotReady => write!(f, "blocklist filter not ready"),
            BlocklistError::BuildFailed(msg) => write!(f, "blocklist build failed: {}", msg),
        }
    }
}

impl std::error::Error for BlocklistError {}

// All conversions for errors from underlying crates we depend on.
impl From<io::Error> for BlocklistError {
    fn from(err: io::Error) -> Self {
        BlocklistError::Io(err)
    }
}

impl From<serde_json::Error> for BlocklistError {
    fn from(err: serde_json::Error) -> Self {
        BlocklistError::Json(err)
    }
}

impl From<reqwest::Error> for BlocklistError {
    fn from(err: reqwest::Error) -> Self {
        BlocklistError::Http(err)
    }
}
