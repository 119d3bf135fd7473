//! Standardized classification of HTTP and network failures

use crate::error::RegistryError;
use crate::registry::Dialect;
use reqwest::StatusCode;

/// Network error categorization
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Map a reqwest failure onto the transport side of the error taxonomy
    pub fn handle_network_error(error: &reqwest::Error, url: &str) -> RegistryError {
        if error.is_timeout() {
            RegistryError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            RegistryError::Transport {
                url: url.to_string(),
                message: format!("connection failed: {}", error),
            }
        } else if error.is_decode() {
            RegistryError::Decode {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            RegistryError::Transport {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// Status code handling for dialect routes
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Classify a non-success answer from a dialect route.
    ///
    /// 404 and 405 on a listing route mean the registry does not speak the
    /// selected dialect at all.
    pub fn handle_status(status: StatusCode, url: &str, dialect: Dialect) -> RegistryError {
        match status.as_u16() {
            404 | 405 => RegistryError::ProtocolMismatch {
                url: url.to_string(),
                status: status.as_u16(),
                dialect,
            },
            code => RegistryError::UnexpectedStatus {
                url: url.to_string(),
                status: code,
            },
        }
    }
}
