//! Error types for registry operations

pub mod handlers;

use crate::registry::Dialect;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Connection refused, reset, DNS failure and friends
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// The registry answered, but not with a status we can use
    #[error("Unexpected HTTP {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The route does not exist on this registry, usually the wrong dialect
    #[error("{url} answered HTTP {status}; the endpoint does not look like a {dialect} registry")]
    ProtocolMismatch {
        url: String,
        status: u16,
        dialect: Dialect,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<RegistryError>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Comparison did not finish within {}s", .limit.as_secs())]
    DeadlineExceeded { limit: Duration },

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used in failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    /// The registry answered 5xx or 429
    Server,
    Decode,
    Protocol,
    Cancelled,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Server => "server",
            ErrorKind::Decode => "decode",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Transport { .. } | RegistryError::Timeout { .. } => ErrorKind::Transport,
            RegistryError::UnexpectedStatus { status, .. } if is_server_status(*status) => {
                ErrorKind::Server
            }
            RegistryError::UnexpectedStatus { .. } | RegistryError::ProtocolMismatch { .. } => {
                ErrorKind::Protocol
            }
            RegistryError::Decode { .. } => ErrorKind::Decode,
            RegistryError::RetriesExhausted { last, .. } => last.kind(),
            RegistryError::Cancelled | RegistryError::DeadlineExceeded { .. } => {
                ErrorKind::Cancelled
            }
            RegistryError::InvalidEndpoint { .. } | RegistryError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether another attempt at the same request could succeed.
    ///
    /// Decode failures and protocol mismatches are deterministic for a given
    /// registry, so only transport problems and server-side hiccups qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Transport { .. } | RegistryError::Timeout { .. } => true,
            RegistryError::UnexpectedStatus { status, .. } => is_server_status(*status),
            _ => false,
        }
    }
}

fn is_server_status(status: u16) -> bool {
    status >= 500 || status == 429
}
