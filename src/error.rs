//! Error types shared by the walker, the router and the transport.
//!
//! ParseError     -> raised synchronously while walking a command tree
//! TransportError -> raised by a `Transport` while performing the exchange
//! RequestError   -> what a router callback / handle observes (Clone)
//! ConfigError    -> tree-file loading failures

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failure while resolving tokens against a command tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A token did not name any child of the current node.
    #[error("unknown sub-command: {0}")]
    UnknownSubcommand(String),

    /// `required` ran against an exhausted token buffer.
    #[error("{label} is required")]
    MissingRequiredArgument { label: String },

    /// Raised by a caller-supplied extractor.
    #[error("{0}")]
    Custom(String),
}

/// Failure inside a transport while sending a resolved request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build request for {url}: {reason}")]
    Build { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Send {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read response body from {url}: {source}")]
    ReadBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unix socket transport is not supported (socket path: {0})")]
    UnsupportedSocketPath(String),

    #[error("{0}")]
    Other(String),
}

/// Outcome error delivered by the router, to a callback or a handle.
///
/// Cloneable so the same failure can reach both the callback and the
/// handle's event channel.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transport(Arc<TransportError>),

    /// The failure was already handed to the callback; nothing is left
    /// for the handle to report.
    #[error("error was delivered to the request callback")]
    Reported,
}

impl From<TransportError> for RequestError {
    fn from(err: TransportError) -> Self {
        RequestError::Transport(Arc::new(err))
    }
}

impl RequestError {
    pub fn is_parse(&self) -> bool {
        matches!(self, RequestError::Parse(_))
    }
}

/// Failure while loading a command tree from a file or string.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tree file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML command tree: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON command tree: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown serializer '{0}' (expected 'json' or 'form')")]
    UnknownSerializer(String),

    #[error("invalid port '{0}'")]
    InvalidPort(String),
}
